use std::{borrow::Cow, sync::Arc};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{DType, KernelKey};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum PipelineKey {
    /// Strided gather from the first type into the second.
    Convert(DType, DType),
    Geometry(KernelKey),
}

impl std::fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineKey::Convert(from, to) => write!(f, "convert_{}_{}", from, to),
            PipelineKey::Geometry(key) => write!(f, "{}", key),
        }
    }
}

/// Compiled compute pipelines, built on first use and kept for the device's lifetime.
#[derive(Default)]
pub struct PipelinePool {
    inner: RwLock<FxHashMap<PipelineKey, Arc<wgpu::ComputePipeline>>>,
}

impl PipelinePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_or_create(
        &self,
        key: PipelineKey,
        device: &wgpu::Device,
        source: impl FnOnce() -> String,
    ) -> Arc<wgpu::ComputePipeline> {
        if let Some(pipeline) = self.inner.read().get(&key) {
            return pipeline.clone();
        }
        let mut pipelines = self.inner.write();
        pipelines
            .entry(key)
            .or_insert_with(|| {
                let label = key.to_string();
                log::debug!("Compiling pipeline {}", label);
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl(Cow::Owned(source())),
                });
                Arc::new(
                    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                        label: Some(&label),
                        layout: None,
                        module: &module,
                        entry_point: "main",
                    }),
                )
            })
            .clone()
    }
}
