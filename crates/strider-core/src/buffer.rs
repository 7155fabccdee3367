use std::sync::Arc;

use crate::{BufferId, DType, Device, Storage};

/// Shared reference to a typed buffer. Lifetime is that of the longest holder.
pub type BufferRef = Arc<Buffer>;

/// A backend allocation holding `numel` elements of a single [`DType`].
///
/// Buffers are immutable once handed out: every operation that produces new
/// values allocates a new buffer, so sharing one between handles is always safe.
pub struct Buffer {
    id: BufferId,
    dt: DType,
    numel: usize,
    device: Device,
    storage: Storage,
}

impl Buffer {
    pub(crate) fn new(storage: Storage, dt: DType, numel: usize, device: Device) -> BufferRef {
        debug_assert!(storage.n_bytes() >= numel * dt.size_of());
        let id = BufferId::new();
        log::debug!(
            "Bound {:?}: {} x {} on {:?} ({} bytes)",
            id,
            numel,
            dt,
            device,
            storage.n_bytes()
        );
        Arc::new(Self {
            id,
            dt,
            numel,
            device,
            storage,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn dt(&self) -> DType {
        self.dt
    }

    pub fn numel(&self) -> usize {
        self.numel
    }

    pub fn n_bytes(&self) -> usize {
        self.numel * self.dt.size_of()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("dt", &self.dt)
            .field("numel", &self.numel)
            .field("device", &self.device)
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        log::debug!("Releasing {:?}", self.id);
        if let Err(e) = self.device.backend().release(&self.storage) {
            // The backend state is unknown after a failed release; there is nothing left to unwind to.
            log::error!("Teardown of {:?} failed: {}", self.id, e);
            std::process::abort();
        }
    }
}
