mod device;
mod pipelines;
pub mod wgsl;

pub use device::*;
pub use pipelines::*;

pub const MIN_STORAGE_BUFFER_SIZE: usize = 16;

/// Usages we use everywhere
pub trait BufferUsagesExt {
    fn standard() -> Self;
}

impl BufferUsagesExt for wgpu::BufferUsages {
    fn standard() -> Self {
        Self::COPY_DST | Self::COPY_SRC | Self::STORAGE
    }
}

/// Rounds a byte size up to something every buffer usage accepts.
pub(crate) fn padded_size(n_bytes: usize) -> u64 {
    let aligned = n_bytes.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
    aligned.max(MIN_STORAGE_BUFFER_SIZE) as u64
}
