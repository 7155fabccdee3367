use std::sync::OnceLock;

use super::sample::{Bilinear, Nearest, Plane, Sampler};
use crate::{ArrayDType, CPUBuffer, DType, GeometryMeta, Interpolation, KernelKind, KernelTable};

pub type GeometryFn = fn(&GeometryMeta, &CPUBuffer, &mut CPUBuffer);

/// Integer outputs round to nearest, floating outputs are stored as computed.
fn store<T: ArrayDType>(v: f64) -> T {
    if T::dt().is_integer() {
        T::from_f64(v.round())
    } else {
        T::from_f64(v)
    }
}

fn for_each_output<T: ArrayDType>(
    meta: &GeometryMeta,
    src: &CPUBuffer,
    dst: &mut CPUBuffer,
    sample: impl Fn(&Plane<T>, usize, usize) -> f64,
) {
    let input = src.to_slice::<T>();
    let output = dst.to_slice_mut::<T>();
    let [o0, o1, o2, o3] = meta.out_dims.map(|d| d as usize);
    for p3 in 0..o3 {
        for p2 in 0..o2 {
            let plane = Plane::new(input, meta, p2, p3);
            for y in 0..o1 {
                for x in 0..o0 {
                    output[meta.out_index(x, y, p2, p3)] = store(sample(&plane, x, y));
                }
            }
        }
    }
}

fn resize<T: ArrayDType, S: Sampler>(meta: &GeometryMeta, src: &CPUBuffer, dst: &mut CPUBuffer) {
    let sx = meta.in_dims[0] as f32 / meta.out_dims[0] as f32;
    let sy = meta.in_dims[1] as f32 / meta.out_dims[1] as f32;
    for_each_output::<T>(meta, src, dst, |plane, x, y| {
        S::clamped(plane, x as f32 * sx, y as f32 * sy)
    });
}

fn transform<T: ArrayDType, S: Sampler>(
    meta: &GeometryMeta,
    src: &CPUBuffer,
    dst: &mut CPUBuffer,
) {
    for_each_output::<T>(meta, src, dst, |plane, x, y| {
        let (sx, sy) = meta.project(x as f32, y as f32);
        S::bounded(plane, sx, sy)
    });
}

macro_rules! register_types {
    ($table:ident, $kernel:ident, $($t:ty => $dt:ident),*) => {
        $(
            $table.register(DType::$dt, Interpolation::Nearest, $kernel::<$t, Nearest> as GeometryFn);
            $table.register(DType::$dt, Interpolation::Bilinear, $kernel::<$t, Bilinear> as GeometryFn);
        )*
    };
}

fn build(kind: KernelKind) -> KernelTable<GeometryFn> {
    let mut table = KernelTable::new(kind);
    match kind {
        KernelKind::Resize => {
            register_types!(table, resize, f32 => F32, f64 => F64, i32 => I32, u32 => U32, u8 => U8, i8 => I8);
        }
        KernelKind::Transform => {
            register_types!(table, transform, f32 => F32, f64 => F64, i32 => I32, u32 => U32, u8 => U8, i8 => I8);
        }
    }
    table
}

/// The CPU kernel table for `kind`. `f16` is storable but has no geometry kernels.
pub fn table(kind: KernelKind) -> &'static KernelTable<GeometryFn> {
    static RESIZE: OnceLock<KernelTable<GeometryFn>> = OnceLock::new();
    static TRANSFORM: OnceLock<KernelTable<GeometryFn>> = OnceLock::new();
    match kind {
        KernelKind::Resize => RESIZE.get_or_init(|| build(kind)),
        KernelKind::Transform => TRANSFORM.get_or_init(|| build(kind)),
    }
}
