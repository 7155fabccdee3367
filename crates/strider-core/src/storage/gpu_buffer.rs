use std::sync::Arc;

use crate::DType;

/// Device allocation. Sizes are padded to [`crate::gpu::MIN_STORAGE_BUFFER_SIZE`] and
/// to a multiple of four bytes, so `n_bytes` may exceed the logical size.
#[derive(Clone, Debug, derive_new::new)]
pub struct GPUBuffer {
    inner: Arc<wgpu::Buffer>,
}

impl GPUBuffer {
    pub fn inner(&self) -> &wgpu::Buffer {
        &self.inner
    }

    pub fn usage(&self) -> wgpu::BufferUsages {
        self.inner.usage()
    }

    pub fn n_bytes(&self) -> usize {
        self.inner.size() as usize
    }

    pub fn dump(&self, _: DType, _: bool) -> String {
        format!("GPU Buffer ({} bytes)", self.inner.size())
    }
}
