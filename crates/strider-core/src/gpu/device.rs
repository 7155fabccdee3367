use std::sync::Arc;

use parking_lot::Mutex;
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Limits};

use super::{padded_size, wgsl, BufferUsagesExt, PipelineKey, PipelinePool};
use crate::{
    Backend, CPUBuffer, Config, DType, DeviceError, GPUBuffer, GeometryMeta, Interpolation,
    KernelKey, KernelKind, KernelTable, Layout, Storage,
};

/// # Device
///
/// A device is a handle to a physical GPU.
/// It is used to create resources and submit commands to the GPU.
///
/// Work is queued and runs asynchronously; [`Backend::read`] and [`Backend::sync`]
/// wait for it. Validation errors raised by queued work are held until the next
/// such synchronization point.
#[derive(Clone)]
pub struct WgpuDevice {
    ordinal: u32,
    info: wgpu::AdapterInfo,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipelines: Arc<PipelinePool>,
    resize: Arc<KernelTable<String>>,
    transform: Arc<KernelTable<String>>,
    error: Arc<Mutex<Option<String>>>,
}

impl std::ops::Deref for WgpuDevice {
    type Target = wgpu::Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wgpu:{}", self.ordinal)
    }
}

impl PartialEq for WgpuDevice {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal && Arc::ptr_eq(&self.device, &other.device)
    }
}

fn kernel_table(kind: KernelKind) -> KernelTable<String> {
    let mut table = KernelTable::new(kind);
    for dt in [DType::F32, DType::I32, DType::U32] {
        for interp in [Interpolation::Nearest, Interpolation::Bilinear] {
            let source = wgsl::geometry_source(KernelKey::new(kind, dt, interp));
            table.register(dt, interp, source);
        }
    }
    table
}

impl WgpuDevice {
    pub fn new() -> Result<Self, DeviceError> {
        let adapter = Self::select_adapter()?;
        log::info!("Adapter: {:?}", adapter.get_info());
        log::info!("Active GPU: {}", adapter.get_info().name);

        let mut device_descriptor = wgpu::DeviceDescriptor {
            label: Some("strider"),
            required_features: wgpu::Features::empty(),
            required_limits: Limits::default(),
        };
        let device_request = pollster::block_on(adapter.request_device(&device_descriptor, None));
        let (device, queue) = match device_request {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("Failed to acq. device, trying with adapter limits: {:?}", e);
                device_descriptor.required_limits = adapter.limits();
                pollster::block_on(adapter.request_device(&device_descriptor, None))
                    .map_err(|e| DeviceError::DeviceAcquisitionFailed(e.to_string()))?
            }
        };
        log::debug!("Device: {:?}", device.limits());

        let error = Arc::new(Mutex::new(None));
        let slot = error.clone();
        device.on_uncaptured_error(Box::new(move |e| {
            log::error!("Uncaptured device error: {}", e);
            slot.lock().get_or_insert_with(|| e.to_string());
        }));

        Ok(Self {
            ordinal: 0,
            info: adapter.get_info(),
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipelines: Arc::new(PipelinePool::new()),
            resize: Arc::new(kernel_table(KernelKind::Resize)),
            transform: Arc::new(kernel_table(KernelKind::Transform)),
            error,
        })
    }

    fn select_adapter() -> Result<Adapter, DeviceError> {
        use wgpu::DeviceType;
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        if Config::global().force_fallback_adapter {
            log::warn!("Requesting the fallback adapter");
            return pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: true,
            }))
            .ok_or(DeviceError::AdapterRequestFailed);
        }
        let backends = wgpu::util::backend_bits_from_env().unwrap_or(wgpu::Backends::PRIMARY);
        instance
            .enumerate_adapters(backends)
            .into_iter()
            .max_by_key(|adapter| match adapter.get_info().device_type {
                DeviceType::DiscreteGpu => 5,
                DeviceType::Other => 4,
                DeviceType::IntegratedGpu => 3,
                DeviceType::VirtualGpu => 2,
                DeviceType::Cpu => 1,
            })
            .ok_or(DeviceError::AdapterRequestFailed)
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    pub fn pipelines(&self) -> &PipelinePool {
        &self.pipelines
    }

    fn table(&self, kind: KernelKind) -> &KernelTable<String> {
        match kind {
            KernelKind::Resize => &self.resize,
            KernelKind::Transform => &self.transform,
        }
    }

    fn check_dtype(&self, dt: DType) -> Result<(), DeviceError> {
        match self.supports(dt) {
            true => Ok(()),
            false => Err(DeviceError::UnsupportedDType(dt, self.name())),
        }
    }

    /// Surfaces the first error raised by queued work, if any.
    fn take_error(&self) -> Result<(), DeviceError> {
        match self.error.lock().take() {
            Some(e) => Err(DeviceError::ExecutionFailed(e)),
            None => Ok(()),
        }
    }

    fn create_buffer(&self, n_bytes: usize) -> GPUBuffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: padded_size(n_bytes),
            usage: wgpu::BufferUsages::standard(),
            mapped_at_creation: false,
        });
        GPUBuffer::new(Arc::new(buffer))
    }

    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        src: &GPUBuffer,
        dst: &GPUBuffer,
        metadata: &[u8],
        groups: (u32, u32),
    ) {
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("metadata"),
                contents: metadata,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.inner().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.inner().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups.0, groups.1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn convert(
        &self,
        src: &Storage,
        layout: &Layout,
        from: DType,
        to: DType,
    ) -> Result<Storage, DeviceError> {
        self.check_dtype(from)?;
        self.check_dtype(to)?;
        let src = src.try_gpu()?;
        layout.check_bounds(src.n_bytes() / from.size_of())?;

        let numel = layout.elements();
        let dst = self.create_buffer(numel * to.size_of());
        if numel == 0 {
            return Ok(Storage::GPU(dst));
        }
        let key = PipelineKey::Convert(from, to);
        let pipeline = self
            .pipelines
            .get_or_create(key, &self.device, || wgsl::convert_source(from, to));
        let meta = wgsl::GatherMeta::new(layout)?;
        log::debug!("Dispatching {} over {} elements", key, numel);
        self.dispatch(&pipeline, src, &dst, bytemuck::bytes_of(&meta), linear_groups(numel));
        Ok(Storage::GPU(dst))
    }
}

/// Workgroup grid covering `numel` invocations, folding into y past the per-dimension limit.
fn linear_groups(numel: usize) -> (u32, u32) {
    const MAX_GROUPS: usize = 65535;
    let groups = numel.div_ceil(wgsl::GATHER_WORKGROUP as usize);
    if groups <= MAX_GROUPS {
        (groups as u32, 1)
    } else {
        (MAX_GROUPS as u32, groups.div_ceil(MAX_GROUPS) as u32)
    }
}

impl Backend for WgpuDevice {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn supports(&self, dt: DType) -> bool {
        wgsl::wgsl_type(dt).is_some()
    }

    fn allocate(&self, dt: DType, numel: usize) -> Result<Storage, DeviceError> {
        self.check_dtype(dt)?;
        Ok(Storage::GPU(self.create_buffer(numel * dt.size_of())))
    }

    fn upload(&self, bytes: &[u8], dt: DType) -> Result<Storage, DeviceError> {
        self.check_dtype(dt)?;
        let mut contents = bytes.to_vec();
        contents.resize(padded_size(bytes.len()) as usize, 0);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: &contents,
                usage: wgpu::BufferUsages::standard(),
            });
        Ok(Storage::GPU(GPUBuffer::new(Arc::new(buffer))))
    }

    fn read(&self, storage: &Storage, n_bytes: usize) -> Result<CPUBuffer, DeviceError> {
        let src = storage.try_gpu()?;
        if n_bytes > src.n_bytes() {
            return Err(DeviceError::OutOfBounds {
                index: n_bytes as isize,
                len: src.n_bytes(),
            });
        }
        if n_bytes == 0 {
            self.sync()?;
            return CPUBuffer::from_bytes(&[]);
        }

        let size = padded_size(n_bytes).min(src.n_bytes() as u64);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(src.inner(), 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| DeviceError::BufferTransferFailed(e.to_string()))?
            .map_err(|e| DeviceError::BufferTransferFailed(e.to_string()))?;
        self.take_error()?;

        let host = {
            let data = slice.get_mapped_range();
            CPUBuffer::from_bytes(&data[..n_bytes])
        };
        staging.unmap();
        host
    }

    fn release(&self, storage: &Storage) -> Result<(), DeviceError> {
        storage.try_gpu()?.inner().destroy();
        Ok(())
    }

    fn gather(&self, src: &Storage, dt: DType, layout: &Layout) -> Result<Storage, DeviceError> {
        self.convert(src, layout, dt, dt)
    }

    fn cast(
        &self,
        src: &Storage,
        layout: &Layout,
        from: DType,
        to: DType,
    ) -> Result<Storage, DeviceError> {
        self.convert(src, layout, from, to)
    }

    fn geometry(
        &self,
        key: KernelKey,
        src: &Storage,
        meta: &GeometryMeta,
    ) -> Result<Storage, DeviceError> {
        let source = self
            .table(key.kind)
            .lookup(&key)
            .ok_or(DeviceError::MissingKernel(key, self.name()))?;
        let src = src.try_gpu()?;
        meta.input_layout()
            .check_bounds(src.n_bytes() / key.dt.size_of())?;
        let dst = self.create_buffer(meta.out_elements() * key.dt.size_of());

        let pipeline = self
            .pipelines
            .get_or_create(PipelineKey::Geometry(key), &self.device, || source.clone());
        let wg = wgsl::GEOMETRY_WORKGROUP;
        let groups = (
            meta.out_dims[0].div_ceil(wg),
            meta.out_dims[1].div_ceil(wg),
        );
        self.dispatch(&pipeline, src, &dst, bytemuck::bytes_of(meta), groups);
        Ok(Storage::GPU(dst))
    }

    fn kernels(&self, kind: KernelKind) -> Vec<(DType, Interpolation)> {
        self.table(kind).supported()
    }

    fn sync(&self) -> Result<(), DeviceError> {
        self.device.poll(wgpu::Maintain::Wait);
        self.take_error()
    }
}
