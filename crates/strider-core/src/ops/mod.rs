mod interp;
mod meta;
mod resize;
mod transform;

pub use interp::*;
pub use meta::*;
pub(crate) use meta::narrow;
pub use resize::*;
pub use transform::*;

use crate::{Array, ArrayError, Buffer, Dim4, KernelKey, KernelKind, Layout, StorageView};

/// Validation run before anything is dispatched.
pub trait OpGuards {
    fn check_arguments(&self) -> Result<(), ArrayError>;

    fn check_dtypes(&self) -> Result<(), ArrayError>;

    fn check_shapes(&self) -> Result<(), ArrayError>;
}

/// A resampling operation over dims 0 and 1 of a resolved input.
pub trait GeometryOp: OpGuards {
    fn kind(&self) -> KernelKind;

    fn input(&self) -> &StorageView;

    fn interp(&self) -> Interpolation;

    fn out_dims(&self) -> Dim4;

    fn meta(&self) -> Result<GeometryMeta, ArrayError>;

    fn run(&self) -> Result<Array, ArrayError> {
        self.check_arguments()?;
        self.check_dtypes()?;
        self.check_shapes()?;

        let input = self.input();
        let key = KernelKey::new(self.kind(), input.dt(), self.interp());
        let meta = self.meta()?;
        let device = input.buffer().device();
        log::debug!(
            "Dispatching {} on {:?}: {:?} -> {:?}",
            key,
            device,
            input.layout(),
            self.out_dims()
        );

        let storage = device
            .backend()
            .geometry(key, input.buffer().storage(), &meta)?;
        let out_dims = self.out_dims();
        let buffer = Buffer::new(storage, input.dt(), out_dims.elements(), device.clone());
        Ok(Array::from_view(StorageView::new(
            buffer,
            Layout::contiguous(out_dims),
        )))
    }
}

pub(crate) fn check_geometry_method(interp: Interpolation) -> Result<(), ArrayError> {
    if interp.is_geometry_method() {
        Ok(())
    } else {
        Err(ArrayError::InvalidArgument(format!(
            "Interpolation {} is not supported by the geometry kernels",
            interp
        )))
    }
}

/// Fails with `InvalidType` unless the input's device registers `kind` for its dtype and `interp`.
pub(crate) fn check_kernel(
    kind: KernelKind,
    input: &StorageView,
    interp: Interpolation,
) -> Result<(), ArrayError> {
    let device = input.buffer().device();
    let dt = input.dt();
    if device.backend().kernels(kind).contains(&(dt, interp)) {
        Ok(())
    } else {
        Err(ArrayError::InvalidType(format!(
            "{} has no {} kernel for {}/{}",
            device.label(),
            kind,
            dt,
            interp
        )))
    }
}

pub(crate) fn check_operands(input: &Dim4, output: &Dim4) -> Result<(), ArrayError> {
    if input.is_empty() || output.is_empty() {
        return Err(ArrayError::EmptyOperand(format!(
            "{:?} -> {:?}",
            input, output
        )));
    }
    Ok(())
}
