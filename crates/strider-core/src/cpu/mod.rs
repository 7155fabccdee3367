mod geometry;
pub mod sample;

pub use geometry::{table, GeometryFn};

use half::f16;
use num_complex::{Complex32, Complex64};

use crate::{
    convert_element, ArrayDType, Backend, CPUBuffer, DType, DeviceError, GeometryMeta,
    Interpolation, KernelKey, KernelKind, Layout, Storage,
};

/// Host backend. Work runs eagerly on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

fn cast_elements<S: ArrayDType, D: ArrayDType>(
    src: &CPUBuffer,
    layout: &Layout,
) -> Result<CPUBuffer, DeviceError> {
    let input = src.to_slice::<S>();
    let mut output = vec![D::zero(); layout.elements()];
    layout.for_each_index(|i, j| output[i] = convert_element::<S, D>(input[j]));
    CPUBuffer::from_slice(&output)
}

macro_rules! cast_to {
    ($src_ty:ty, $to:expr, $src:expr, $layout:expr) => {
        match $to {
            DType::F16 => cast_elements::<$src_ty, f16>($src, $layout),
            DType::F32 => cast_elements::<$src_ty, f32>($src, $layout),
            DType::F64 => cast_elements::<$src_ty, f64>($src, $layout),
            DType::C32 => cast_elements::<$src_ty, Complex32>($src, $layout),
            DType::C64 => cast_elements::<$src_ty, Complex64>($src, $layout),
            DType::I32 => cast_elements::<$src_ty, i32>($src, $layout),
            DType::U32 => cast_elements::<$src_ty, u32>($src, $layout),
            DType::U8 => cast_elements::<$src_ty, u8>($src, $layout),
            DType::I8 => cast_elements::<$src_ty, i8>($src, $layout),
        }
    };
}

impl Backend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn supports(&self, _dt: DType) -> bool {
        true
    }

    fn allocate(&self, dt: DType, numel: usize) -> Result<Storage, DeviceError> {
        Ok(Storage::CPU(CPUBuffer::zeros(numel * dt.size_of())?))
    }

    fn upload(&self, bytes: &[u8], _dt: DType) -> Result<Storage, DeviceError> {
        Ok(Storage::CPU(CPUBuffer::from_bytes(bytes)?))
    }

    fn read(&self, storage: &Storage, n_bytes: usize) -> Result<CPUBuffer, DeviceError> {
        let buffer = storage.try_cpu()?;
        let bytes = buffer
            .as_bytes()
            .get(..n_bytes)
            .ok_or(DeviceError::OutOfBounds {
                index: n_bytes as isize,
                len: buffer.n_bytes(),
            })?;
        CPUBuffer::from_bytes(bytes)
    }

    fn release(&self, _storage: &Storage) -> Result<(), DeviceError> {
        Ok(())
    }

    fn gather(&self, src: &Storage, dt: DType, layout: &Layout) -> Result<Storage, DeviceError> {
        let src = src.try_cpu()?;
        let size = dt.size_of();
        layout.check_bounds(src.n_bytes() / size)?;

        let mut dst = CPUBuffer::zeros(layout.elements() * size)?;
        let (from, to) = (src.as_bytes(), dst.as_bytes_mut());
        layout.for_each_index(|i, j| {
            to[i * size..(i + 1) * size].copy_from_slice(&from[j * size..(j + 1) * size])
        });
        Ok(Storage::CPU(dst))
    }

    fn cast(
        &self,
        src: &Storage,
        layout: &Layout,
        from: DType,
        to: DType,
    ) -> Result<Storage, DeviceError> {
        let src = src.try_cpu()?;
        layout.check_bounds(src.n_bytes() / from.size_of())?;
        let out = match from {
            DType::F16 => cast_to!(f16, to, src, layout),
            DType::F32 => cast_to!(f32, to, src, layout),
            DType::F64 => cast_to!(f64, to, src, layout),
            DType::C32 => cast_to!(Complex32, to, src, layout),
            DType::C64 => cast_to!(Complex64, to, src, layout),
            DType::I32 => cast_to!(i32, to, src, layout),
            DType::U32 => cast_to!(u32, to, src, layout),
            DType::U8 => cast_to!(u8, to, src, layout),
            DType::I8 => cast_to!(i8, to, src, layout),
        }?;
        Ok(Storage::CPU(out))
    }

    fn geometry(
        &self,
        key: KernelKey,
        src: &Storage,
        meta: &GeometryMeta,
    ) -> Result<Storage, DeviceError> {
        let kernel = table(key.kind)
            .lookup(&key)
            .ok_or(DeviceError::MissingKernel(key, self.name()))?;
        let src = src.try_cpu()?;
        meta.input_layout().check_bounds(src.n_bytes() / key.dt.size_of())?;

        let mut dst = CPUBuffer::zeros(meta.out_elements() * key.dt.size_of())?;
        kernel(meta, src, &mut dst);
        Ok(Storage::CPU(dst))
    }

    fn kernels(&self, kind: KernelKind) -> Vec<(DType, Interpolation)> {
        table(kind).supported()
    }

    fn sync(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}
