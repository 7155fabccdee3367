use crate::{cpu::CpuBackend, Backend, DType, KernelKey};

#[cfg(feature = "gpu")]
use crate::gpu::WgpuDevice;

/// Failures reported by the backend primitive layer.
///
/// These never cross the [`crate::Array`] API; they are translated into [`crate::ArrayError`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to allocate {0} bytes")]
    AllocationFailed(usize),
    #[error("DType {0:?} is not supported by the {1} backend")]
    UnsupportedDType(DType, &'static str),
    #[error("No {0:?} kernel registered on the {1} backend")]
    MissingKernel(KernelKey, &'static str),
    #[error("Device mismatch, requested device: {0:?}, actual device: {1:?}")]
    DeviceMismatch(String, String),
    #[error("Access at element {index} is outside a buffer of {len} elements")]
    OutOfBounds { index: isize, len: usize },
    #[error("{0} does not fit the kernel ABI")]
    AbiOverflow(String),
    #[error("The {0} backend was not compiled in")]
    BackendUnavailable(&'static str),
    #[error("Failed to request an adapter")]
    AdapterRequestFailed,
    #[error("Failed to acquire device with error: {0}")]
    DeviceAcquisitionFailed(String),
    #[error("Failed to transfer buffer with error: {0}")]
    BufferTransferFailed(String),
    #[error("Kernel execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Failed to release buffer: {0}")]
    ReleaseFailed(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceRequest {
    #[default]
    CPU,
    GPU,
}

#[derive(Clone, Default, PartialEq)]
pub enum Device {
    #[default]
    CPU,
    #[cfg(feature = "gpu")]
    GPU(WgpuDevice),
}

static CPU_BACKEND: CpuBackend = CpuBackend;

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::CPU => write!(f, "CPU"),
            #[cfg(feature = "gpu")]
            Device::GPU(gpu) => write!(f, "GPU:{}", gpu.ordinal()),
        }
    }
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::CPU)
    }

    pub fn is_gpu(&self) -> bool {
        !self.is_cpu()
    }

    pub fn request_device(request: DeviceRequest) -> Result<Self, DeviceError> {
        match request {
            DeviceRequest::CPU => Ok(Device::CPU),
            #[cfg(feature = "gpu")]
            DeviceRequest::GPU => Ok(Device::GPU(WgpuDevice::new()?)),
            #[cfg(not(feature = "gpu"))]
            DeviceRequest::GPU => Err(DeviceError::BackendUnavailable("gpu")),
        }
    }

    pub fn label(&self) -> String {
        format!("{:?}", self)
    }

    #[cfg(feature = "gpu")]
    pub fn try_gpu(&self) -> Result<&WgpuDevice, DeviceError> {
        match self {
            Device::GPU(gpu) => Ok(gpu),
            Device::CPU => Err(DeviceError::DeviceMismatch(
                "GPU".to_string(),
                "CPU".to_string(),
            )),
        }
    }

    /// The primitive layer every array operation lowers to.
    pub fn backend(&self) -> &dyn Backend {
        match self {
            Device::CPU => &CPU_BACKEND,
            #[cfg(feature = "gpu")]
            Device::GPU(gpu) => gpu,
        }
    }

    /// Blocks until all work queued on this device has completed.
    pub fn sync(&self) -> Result<(), DeviceError> {
        self.backend().sync()
    }
}
