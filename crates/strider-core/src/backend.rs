use crate::{
    CPUBuffer, DType, DeviceError, GeometryMeta, Interpolation, KernelKey, KernelKind, Layout,
    Storage,
};

/// Device primitive layer.
///
/// Every [`crate::Array`] operation lowers to calls on this trait. Implementations
/// may queue work asynchronously; [`Backend::read`] and [`Backend::sync`] are
/// the only points at which queued work must have finished.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, dt: DType) -> bool;

    /// Allocates a zero-filled buffer of `numel` elements.
    fn allocate(&self, dt: DType, numel: usize) -> Result<Storage, DeviceError>;

    fn upload(&self, bytes: &[u8], dt: DType) -> Result<Storage, DeviceError>;

    /// Copies the first `n_bytes` of `storage` back to the host.
    fn read(&self, storage: &Storage, n_bytes: usize) -> Result<CPUBuffer, DeviceError>;

    fn release(&self, storage: &Storage) -> Result<(), DeviceError>;

    /// Materializes the elements `layout` addresses into a new contiguous buffer.
    fn gather(&self, src: &Storage, dt: DType, layout: &Layout) -> Result<Storage, DeviceError>;

    /// Like [`Backend::gather`], converting each element from `from` to `to`.
    fn cast(
        &self,
        src: &Storage,
        layout: &Layout,
        from: DType,
        to: DType,
    ) -> Result<Storage, DeviceError>;

    /// Runs a resampling kernel, producing a contiguous buffer shaped by `meta.out_dims`.
    fn geometry(
        &self,
        key: KernelKey,
        src: &Storage,
        meta: &GeometryMeta,
    ) -> Result<Storage, DeviceError>;

    /// The `(dtype, interpolation)` pairs with a registered kernel of `kind`.
    fn kernels(&self, kind: KernelKind) -> Vec<(DType, Interpolation)>;

    fn sync(&self) -> Result<(), DeviceError>;
}
