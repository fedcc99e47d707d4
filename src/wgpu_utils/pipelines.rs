//! Compute pipeline handles and a `PipelineManager` that owns the actual
//! `wgpu::ComputePipeline`s behind them, so shader hot-reload
//! (`try_reload_shaders`) can swap a pipeline in place without invalidating
//! anything that only ever held a `ComputePipelineHandle`.

use super::shader::{ShaderDirectory, SHADER_ENTRY_POINT_NAME};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComputePipelineHandle(usize);

pub struct ComputePipelineCreationDesc {
    pub label: &'static str,
    pub layout: Rc<wgpu::PipelineLayout>,
    pub shader_path: PathBuf,
}

impl ComputePipelineCreationDesc {
    pub fn new(label: &'static str, layout: Rc<wgpu::PipelineLayout>, shader_path: &Path) -> Self {
        ComputePipelineCreationDesc {
            label,
            layout,
            shader_path: shader_path.to_path_buf(),
        }
    }
}

struct ManagedPipeline {
    desc: ComputePipelineCreationDesc,
    pipeline: wgpu::ComputePipeline,
}

#[derive(Default)]
pub struct PipelineManager {
    pipelines: Vec<ManagedPipeline>,
}

impl PipelineManager {
    pub fn new() -> Self {
        PipelineManager { pipelines: Vec::new() }
    }

    pub fn create_compute_pipeline(
        &mut self,
        device: &wgpu::Device,
        shader_dir: &ShaderDirectory,
        desc: ComputePipelineCreationDesc,
    ) -> ComputePipelineHandle {
        let pipeline = Self::build(device, shader_dir, &desc).unwrap_or_else(|e| panic!("failed to compile shader for {}: {}", desc.label, e));
        let handle = ComputePipelineHandle(self.pipelines.len());
        self.pipelines.push(ManagedPipeline { desc, pipeline });
        handle
    }

    fn build(device: &wgpu::Device, shader_dir: &ShaderDirectory, desc: &ComputePipelineCreationDesc) -> Result<wgpu::ComputePipeline, String> {
        let module = shader_dir.load_shader_module(device, &desc.shader_path)?;
        Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&desc.layout),
            module: &module,
            entry_point: SHADER_ENTRY_POINT_NAME,
        }))
    }

    pub fn get_compute(&self, handle: &ComputePipelineHandle) -> &wgpu::ComputePipeline {
        &self.pipelines[handle.0].pipeline
    }

    /// Recompiles every registered pipeline from its shader file. A single
    /// kernel failing to compile (e.g. a mid-edit syntax error) logs and
    /// keeps the previously working pipeline rather than aborting the whole
    /// reload, so iterating on one kernel doesn't freeze all the others.
    pub fn try_reload_shaders(&mut self, device: &wgpu::Device, shader_dir: &ShaderDirectory) {
        for managed in &mut self.pipelines {
            match Self::build(device, shader_dir, &managed.desc) {
                Ok(pipeline) => managed.pipeline = pipeline,
                Err(e) => log::error!("failed to reload shader for {}: {}", managed.desc.label, e),
            }
        }
    }
}
