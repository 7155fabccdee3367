mod cpu_buffer;
#[cfg(feature = "gpu")]
mod gpu_buffer;

pub use cpu_buffer::*;
#[cfg(feature = "gpu")]
pub use gpu_buffer::*;

use crate::{DType, DeviceError};

/// Backend-specific allocation, without type or shape information.
#[derive(Debug)]
pub enum Storage {
    CPU(CPUBuffer),
    #[cfg(feature = "gpu")]
    GPU(GPUBuffer),
}

impl Storage {
    pub fn n_bytes(&self) -> usize {
        match self {
            Storage::CPU(c) => c.n_bytes(),
            #[cfg(feature = "gpu")]
            Storage::GPU(g) => g.n_bytes(),
        }
    }

    pub fn dump(&self, dt: DType, full: bool) -> String {
        match self {
            Storage::CPU(c) => c.dump(dt, full),
            #[cfg(feature = "gpu")]
            Storage::GPU(g) => g.dump(dt, full),
        }
    }

    pub fn try_cpu(&self) -> Result<&CPUBuffer, DeviceError> {
        match self {
            Storage::CPU(c) => Ok(c),
            #[cfg(feature = "gpu")]
            Storage::GPU(_g) => Err(DeviceError::DeviceMismatch(
                "CPU".to_string(),
                "GPU".to_string(),
            )),
        }
    }

    #[cfg(feature = "gpu")]
    pub fn try_gpu(&self) -> Result<&GPUBuffer, DeviceError> {
        match self {
            Storage::GPU(g) => Ok(g),
            Storage::CPU(_c) => Err(DeviceError::DeviceMismatch(
                "GPU".to_string(),
                "CPU".to_string(),
            )),
        }
    }
}
