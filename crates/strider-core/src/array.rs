use derive_new::new;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::{
    ArrayDType, Buffer, BufferRef, CPUBuffer, Config, DType, Device, DeviceError, Dim4,
    GeometryOp, Interpolation, Layout, Resize, Seq, Strides, Transform, ViewPolicy, MAX_DIMS,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ArrayError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid type: {0}")]
    InvalidType(String),
    #[error("Cannot query the element type of an unbound array")]
    TypeQuery,
    #[error("Allocation failed: {0}")]
    AllocationFailure(String),
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),
    #[error("Empty operand: {0}")]
    EmptyOperand(String),
    #[error("Device execution failed: {0}")]
    DeviceExecution(String),
    #[error("Teardown failed: {0}")]
    Teardown(String),
}

impl From<DeviceError> for ArrayError {
    fn from(e: DeviceError) -> Self {
        let msg = e.to_string();
        match e {
            DeviceError::AllocationFailed(_) => ArrayError::AllocationFailure(msg),
            DeviceError::UnsupportedDType(..) | DeviceError::MissingKernel(..) => {
                ArrayError::InvalidType(msg)
            }
            DeviceError::DeviceMismatch(..)
            | DeviceError::BackendUnavailable(_)
            | DeviceError::AbiOverflow(_) => ArrayError::InvalidArgument(msg),
            DeviceError::OutOfBounds { .. } => ArrayError::IndexOutOfRange(msg),
            DeviceError::ReleaseFailed(_) => ArrayError::Teardown(msg),
            DeviceError::AdapterRequestFailed
            | DeviceError::DeviceAcquisitionFailed(_)
            | DeviceError::BufferTransferFailed(_)
            | DeviceError::ExecutionFailed(_) => ArrayError::DeviceExecution(msg),
        }
    }
}

/// Where the data handed to [`Array::from_host`] lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Host,
    /// Foreign device memory. Never accepted.
    Device,
}

/// A buffer together with the layout used to address it.
#[derive(new, Debug, Clone)]
pub struct StorageView {
    buffer: BufferRef,
    layout: Layout,
}

impl StorageView {
    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn dt(&self) -> DType {
        self.buffer.dt()
    }

    /// Applies a selector under `policy`.
    fn select(&self, selector: &[Seq; MAX_DIMS], policy: ViewPolicy) -> Result<Self, ArrayError> {
        let layout = self.layout.apply(selector)?;
        match policy {
            ViewPolicy::Alias => Ok(Self::new(self.buffer.clone(), layout)),
            ViewPolicy::Gather => self.gather(&layout),
        }
    }

    /// Copies the elements `layout` addresses into a fresh contiguous buffer.
    fn gather(&self, layout: &Layout) -> Result<Self, ArrayError> {
        let device = self.buffer.device();
        let storage = device
            .backend()
            .gather(self.buffer.storage(), self.dt(), layout)?;
        let buffer = Buffer::new(storage, self.dt(), layout.elements(), device.clone());
        Ok(Self::new(buffer, Layout::contiguous(layout.dims())))
    }

    /// Host copy of the logical elements, in column-major order.
    fn download(&self) -> Result<CPUBuffer, ArrayError> {
        let n_bytes = self.layout.elements() * self.dt().size_of();
        let backend = self.buffer.device().backend();
        if self.layout.is_linear() {
            return Ok(backend.read(self.buffer.storage(), n_bytes)?);
        }
        let packed = self.gather(&self.layout)?;
        Ok(backend.read(packed.buffer.storage(), n_bytes)?)
    }
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Unbound,
    Resolved(StorageView),
    Pending {
        source: StorageView,
        selector: [Seq; MAX_DIMS],
        policy: ViewPolicy,
    },
}

/// Handle to an N-D array, either bound to a buffer or a pending view of another array.
///
/// Cloning is a weak copy: the clone shares the underlying buffer. Use [`Array::copy`]
/// for an independent duplicate. Accessors resolve a pending view on first use; the
/// resolution is cached behind the handle's lock and never repeated.
#[derive(Default)]
pub struct Array {
    state: RwLock<State>,
}

impl Clone for Array {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.state.read() {
            State::Unbound => write!(f, "Array(unbound)"),
            State::Resolved(view) => f
                .debug_struct("Array")
                .field("buffer", &view.buffer.id())
                .field("dt", &view.dt())
                .field("layout", &view.layout)
                .finish(),
            State::Pending {
                source, selector, ..
            } => f
                .debug_struct("Array")
                .field("source", &source.buffer.id())
                .field("selector", selector)
                .finish(),
        }
    }
}

fn unbound() -> ArrayError {
    ArrayError::InvalidArgument("Array is not bound to a buffer".to_string())
}

impl Array {
    pub(crate) fn from_view(view: StorageView) -> Self {
        Self {
            state: RwLock::new(State::Resolved(view)),
        }
    }

    fn check_support(device: &Device, dt: DType) -> Result<(), ArrayError> {
        let backend = device.backend();
        if backend.supports(dt) {
            Ok(())
        } else {
            Err(DeviceError::UnsupportedDType(dt, backend.name()).into())
        }
    }

    /// A zero-filled array.
    pub fn zeros(dims: Dim4, dt: DType, device: &Device) -> Result<Self, ArrayError> {
        Self::check_support(device, dt)?;
        let storage = device.backend().allocate(dt, dims.elements())?;
        let buffer = Buffer::new(storage, dt, dims.elements(), device.clone());
        Ok(Self::from_view(StorageView::new(
            buffer,
            Layout::contiguous(dims),
        )))
    }

    /// Uploads `data`, laid out column-major, into a new array of shape `dims`.
    pub fn from_host<T: ArrayDType>(
        dims: Dim4,
        data: &[T],
        source: Source,
        device: &Device,
    ) -> Result<Self, ArrayError> {
        if source != Source::Host {
            return Err(ArrayError::InvalidArgument(
                "Only host memory can be uploaded".to_string(),
            ));
        }
        if data.len() != dims.elements() {
            return Err(ArrayError::InvalidArgument(format!(
                "{} elements do not fill {:?}",
                data.len(),
                dims
            )));
        }
        Self::check_support(device, T::dt())?;
        let storage = device
            .backend()
            .upload(bytemuck::cast_slice(data), T::dt())?;
        let buffer = Buffer::new(storage, T::dt(), data.len(), device.clone());
        Ok(Self::from_view(StorageView::new(
            buffer,
            Layout::contiguous(dims),
        )))
    }

    pub fn is_bound(&self) -> bool {
        !matches!(&*self.state.read(), State::Unbound)
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.state.read(), State::Pending { .. })
    }

    /// Element type. Known without resolving a pending view.
    pub fn dt(&self) -> Result<DType, ArrayError> {
        match &*self.state.read() {
            State::Unbound => Err(ArrayError::TypeQuery),
            State::Resolved(view) => Ok(view.dt()),
            State::Pending { source, .. } => Ok(source.dt()),
        }
    }

    /// Resolves a pending view, returning the buffer the array reads from.
    ///
    /// Only the first call on a pending handle does any work; if it fails the handle
    /// stays pending.
    pub fn get(&self) -> Result<BufferRef, ArrayError> {
        Ok(self.resolved()?.buffer)
    }

    pub(crate) fn resolved(&self) -> Result<StorageView, ArrayError> {
        let state = self.state.upgradable_read();
        let view = match &*state {
            State::Resolved(view) => return Ok(view.clone()),
            State::Unbound => return Err(unbound()),
            State::Pending {
                source,
                selector,
                policy,
            } => {
                let view = source.select(selector, *policy)?;
                log::debug!(
                    "Resolved view of {:?} ({}): {:?}",
                    source.buffer.id(),
                    policy,
                    view.layout
                );
                view
            }
        };
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        *state = State::Resolved(view.clone());
        Ok(view)
    }

    pub fn layout(&self) -> Result<Layout, ArrayError> {
        Ok(*self.resolved()?.layout())
    }

    pub fn dims(&self) -> Result<Dim4, ArrayError> {
        Ok(self.layout()?.dims())
    }

    pub fn dim(&self, index: usize) -> Result<usize, ArrayError> {
        self.dims()?.get(index).copied().ok_or_else(|| {
            ArrayError::InvalidArgument(format!("Dimension {} of {}", index, MAX_DIMS))
        })
    }

    pub fn strides(&self) -> Result<Strides, ArrayError> {
        Ok(self.layout()?.strides())
    }

    pub fn offset(&self) -> Result<usize, ArrayError> {
        Ok(self.layout()?.offset())
    }

    pub fn elements(&self) -> Result<usize, ArrayError> {
        Ok(self.dims()?.elements())
    }

    pub fn numdims(&self) -> Result<usize, ArrayError> {
        Ok(self.dims()?.ndims())
    }

    pub fn bytes(&self) -> Result<usize, ArrayError> {
        let view = self.resolved()?;
        Ok(view.layout.elements() * view.dt().size_of())
    }

    pub fn is_linear(&self) -> Result<bool, ArrayError> {
        Ok(self.layout()?.is_linear())
    }

    pub fn is_empty(&self) -> Result<bool, ArrayError> {
        Ok(self.dims()?.is_empty())
    }

    pub fn is_scalar(&self) -> Result<bool, ArrayError> {
        Ok(self.dims()?.is_scalar())
    }

    pub fn is_vector(&self) -> Result<bool, ArrayError> {
        Ok(self.dims()?.is_vector())
    }

    pub fn is_row(&self) -> Result<bool, ArrayError> {
        Ok(self.dims()?.is_row())
    }

    pub fn is_column(&self) -> Result<bool, ArrayError> {
        Ok(self.dims()?.is_column())
    }

    // Type predicates go through `dt` and leave a pending view pending.
    pub fn is_floating(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_floating())
    }

    pub fn is_real_floating(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_real_floating())
    }

    pub fn is_integer(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_integer())
    }

    pub fn is_complex(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_complex())
    }

    pub fn is_real(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_real())
    }

    pub fn is_single(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_single())
    }

    pub fn is_double(&self) -> Result<bool, ArrayError> {
        Ok(self.dt()?.is_double())
    }

    pub fn device(&self) -> Result<Device, ArrayError> {
        Ok(self.resolved()?.buffer.device().clone())
    }

    /// A pending view of `self` under the configured [`ViewPolicy`].
    ///
    /// Missing trailing selectors span their whole dimension.
    pub fn index(&self, selectors: &[Seq]) -> Result<Array, ArrayError> {
        self.index_with_policy(selectors, Config::global().view_policy)
    }

    pub fn index_with_policy(
        &self,
        selectors: &[Seq],
        policy: ViewPolicy,
    ) -> Result<Array, ArrayError> {
        if selectors.is_empty() || selectors.len() > MAX_DIMS {
            return Err(ArrayError::InvalidArgument(format!(
                "Expected 1 to {} selectors, got {}",
                MAX_DIMS,
                selectors.len()
            )));
        }
        let mut selector = [Seq::span(); MAX_DIMS];
        selector[..selectors.len()].copy_from_slice(selectors);

        let source = self.resolved()?;
        source.layout.apply(&selector)?;
        Ok(Array {
            state: RwLock::new(State::Pending {
                source,
                selector,
                policy,
            }),
        })
    }

    /// Deep copy into a fresh contiguous buffer.
    pub fn copy(&self) -> Result<Array, ArrayError> {
        let view = self.resolved()?;
        Ok(Self::from_view(view.gather(&view.layout)?))
    }

    /// Element-wise conversion into a new array of type `dt`.
    pub fn cast(&self, dt: DType) -> Result<Array, ArrayError> {
        let view = self.resolved()?;
        let device = view.buffer.device();
        Self::check_support(device, view.dt())?;
        Self::check_support(device, dt)?;
        let storage =
            device
                .backend()
                .cast(view.buffer.storage(), &view.layout, view.dt(), dt)?;
        let buffer = Buffer::new(storage, dt, view.layout.elements(), device.clone());
        Ok(Self::from_view(StorageView::new(
            buffer,
            Layout::contiguous(view.layout.dims()),
        )))
    }

    /// Raw bytes of the logical elements. Waits for queued work.
    pub fn host_bytes(&self) -> Result<Vec<u8>, ArrayError> {
        Ok(self.resolved()?.download()?.as_bytes().to_vec())
    }

    /// Logical elements in column-major order. Waits for queued work.
    pub fn host<T: ArrayDType>(&self) -> Result<Vec<T>, ArrayError> {
        let view = self.resolved()?;
        if view.dt() != T::dt() {
            return Err(ArrayError::InvalidType(format!(
                "Requested {} from a {} array",
                T::dt(),
                view.dt()
            )));
        }
        Ok(view.download()?.to_slice::<T>().to_vec())
    }

    /// Replaces the contents of this handle with `data`.
    ///
    /// A new buffer is bound; handles sharing the old one keep their values.
    pub fn write<T: ArrayDType>(&self, data: &[T]) -> Result<(), ArrayError> {
        let view = self.resolved()?;
        if view.dt() != T::dt() {
            return Err(ArrayError::InvalidType(format!(
                "Cannot write {} into a {} array",
                T::dt(),
                view.dt()
            )));
        }
        let dims = view.layout.dims();
        let fresh = Self::from_host(dims, data, Source::Host, view.buffer.device())?;
        let fresh = fresh.resolved()?;
        *self.state.write() = State::Resolved(fresh);
        Ok(())
    }

    /// Deep copy onto `device`.
    pub fn to(&self, device: &Device) -> Result<Array, ArrayError> {
        let view = self.resolved()?;
        Self::check_support(device, view.dt())?;
        let host = view.download()?;
        let storage = device.backend().upload(host.as_bytes(), view.dt())?;
        let buffer = Buffer::new(
            storage,
            view.dt(),
            view.layout.elements(),
            device.clone(),
        );
        Ok(Self::from_view(StorageView::new(
            buffer,
            Layout::contiguous(view.layout.dims()),
        )))
    }

    /// Waits for all work queued on this array's device.
    pub fn sync(&self) -> Result<(), ArrayError> {
        Ok(self.device()?.sync()?)
    }

    /// Scales dims 0 and 1 to `out0 x out1`.
    pub fn resize(
        &self,
        out0: usize,
        out1: usize,
        method: Interpolation,
    ) -> Result<Array, ArrayError> {
        Resize::new(self.resolved()?, out0, out1, method).run()
    }

    /// Warps dims 0 and 1 by `matrix`, see [`Transform`].
    pub fn transform(
        &self,
        matrix: &Array,
        out0: usize,
        out1: usize,
        method: Interpolation,
        inverse: bool,
    ) -> Result<Array, ArrayError> {
        Transform::new(
            self.resolved()?,
            matrix.clone(),
            out0,
            out1,
            method,
            inverse,
        )
        .run()
    }
}
