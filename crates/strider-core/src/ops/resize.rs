use derive_new::new;

use crate::{
    dim4, ArrayError, Dim4, GeometryMeta, GeometryOp, Interpolation, KernelKind, OpGuards,
    StorageView,
};

use super::{check_geometry_method, check_kernel, check_operands};

/// Scales dims 0 and 1 to `out0 x out1`; dims 2 and 3 pass through.
#[derive(new, Debug, Clone)]
pub struct Resize {
    input: StorageView,
    out0: usize,
    out1: usize,
    interp: Interpolation,
}

impl OpGuards for Resize {
    fn check_arguments(&self) -> Result<(), ArrayError> {
        check_geometry_method(self.interp)
    }

    fn check_dtypes(&self) -> Result<(), ArrayError> {
        check_kernel(KernelKind::Resize, &self.input, self.interp)
    }

    fn check_shapes(&self) -> Result<(), ArrayError> {
        check_operands(&self.input.layout().dims(), &self.out_dims())
    }
}

impl GeometryOp for Resize {
    fn kind(&self) -> KernelKind {
        KernelKind::Resize
    }

    fn input(&self) -> &StorageView {
        &self.input
    }

    fn interp(&self) -> Interpolation {
        self.interp
    }

    fn out_dims(&self) -> Dim4 {
        let in_dims = self.input.layout().dims();
        dim4!(self.out0, self.out1, in_dims[2], in_dims[3])
    }

    fn meta(&self) -> Result<GeometryMeta, ArrayError> {
        GeometryMeta::new(self.out_dims(), self.input.layout())
    }
}
