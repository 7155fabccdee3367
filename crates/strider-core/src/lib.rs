mod array;
mod backend;
mod buffer;
mod buffer_id;
mod config;
pub mod cpu;
mod device;
mod dim;
mod dtype;
#[cfg(feature = "gpu")]
pub mod gpu;
mod kernels;
mod layout;
mod ops;
mod seq;
mod storage;
mod strides;

pub use array::*;
pub use backend::*;
pub use buffer::*;
pub use buffer_id::*;
pub use config::*;
pub use device::*;
pub use dim::*;
pub use dtype::*;
pub use kernels::*;
pub use layout::*;
pub use ops::*;
pub use seq::*;
pub use storage::*;
pub use strides::*;

pub use num_complex::{Complex32, Complex64};

/// Builds a [`Dim4`] from one to four extents, padding the rest with 1.
#[macro_export]
macro_rules! dim4 {
    ($d0:expr) => {
        $crate::Dim4::new([$d0, 1, 1, 1])
    };
    ($d0:expr, $d1:expr) => {
        $crate::Dim4::new([$d0, $d1, 1, 1])
    };
    ($d0:expr, $d1:expr, $d2:expr) => {
        $crate::Dim4::new([$d0, $d1, $d2, 1])
    };
    ($d0:expr, $d1:expr, $d2:expr, $d3:expr) => {
        $crate::Dim4::new([$d0, $d1, $d2, $d3])
    };
}

pub mod prelude {
    pub use crate::{dim4, Array, DType, Device, DeviceRequest, Dim4, Interpolation, Seq, Source};
}
