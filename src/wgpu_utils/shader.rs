//! GLSL loading, `#include` resolution, and SPIR-V compilation. Watches the
//! shader directory with `notify` so a development build can hot-swap
//! kernels via `PipelineManager::try_reload_shaders`.

use lazy_static::lazy_static;
use notify::Watcher;
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const SHADER_ENTRY_POINT_NAME: &str = "main";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShaderStage {
    Compute,
}

fn compile_glsl(glsl_code: &str, identifier: &str, stage: ShaderStage) -> Result<Vec<u32>, String> {
    let kind = match stage {
        ShaderStage::Compute => shaderc::ShaderKind::Compute,
    };

    let compiler = shaderc::Compiler::new().ok_or("failed to create shaderc compiler")?;
    let mut options = shaderc::CompileOptions::new().ok_or("failed to create shaderc compile options")?;
    options.set_warnings_as_errors();
    options.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let binary_result = compiler
        .compile_into_spirv(glsl_code, kind, identifier, SHADER_ENTRY_POINT_NAME, Some(&options))
        .map_err(|e| e.to_string())?;
    if binary_result.get_num_warnings() > 0 {
        log::warn!("warnings compiling {}:\n{}", identifier, binary_result.get_warning_messages());
    }
    Ok(binary_result.as_binary().to_vec())
}

fn load_glsl_and_resolve_includes(path: &Path) -> Result<String, String> {
    lazy_static! {
        static ref INCLUDE_REGEX: Regex = Regex::new(r#"^\s*#\s*include\s+[<"](?P<file>.*)[>"]"#).unwrap();
    }

    let glsl_code = std::fs::read_to_string(path).map_err(|e| format!("failed to read shader file {:?}: {}", path, e))?;

    let mut expanded_code = Vec::new();
    for (line_number, line) in glsl_code.lines().enumerate() {
        match INCLUDE_REGEX.captures(line) {
            Some(captures) => {
                let included_file = captures
                    .name("file")
                    .ok_or_else(|| format!("invalid include line in {:?} line {}: {}", path, line_number, line))?
                    .as_str();
                let included_path = path.parent().unwrap_or_else(|| Path::new(".")).join(included_file);
                expanded_code.push("#line 1".to_string());
                expanded_code.push(load_glsl_and_resolve_includes(&included_path)?);
                expanded_code.push(format!("#line {}", line_number + 2));
            }
            None => expanded_code.push(line.to_string()),
        }
    }

    Ok(expanded_code.join("\n"))
}

pub struct ShaderDirectory {
    #[allow(dead_code)]
    watcher: Option<notify::RecommendedWatcher>,
    detected_change: Arc<AtomicBool>,
    directory: PathBuf,
}

impl ShaderDirectory {
    pub fn new(path: &Path) -> Self {
        let detected_change = Arc::new(AtomicBool::new(false));
        let detected_change_evt_ref = detected_change.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(_) => detected_change_evt_ref.store(true, Ordering::Relaxed),
            Err(e) => log::warn!("shader directory watcher error: {:?}", e),
        })
        .and_then(|mut watcher| {
            watcher.watch(path, notify::RecursiveMode::Recursive)?;
            Ok(watcher)
        });

        let watcher = match watcher {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("could not watch shader directory {:?} for hot reload: {}", path, e);
                None
            }
        };

        ShaderDirectory {
            watcher,
            detected_change,
            directory: PathBuf::from(path),
        }
    }

    /// Checks and clears the "a file changed" flag, used by the driver to
    /// decide whether to call `try_reload_shaders` on its next `step`.
    pub fn detected_change(&self) -> bool {
        self.detected_change.swap(false, Ordering::Relaxed)
    }

    pub fn load_shader_module(&self, device: &wgpu::Device, relative_filename: &Path) -> Result<wgpu::ShaderModule, String> {
        let path = self.directory.join(relative_filename);

        let shader_stage = match path.extension().and_then(OsStr::to_str) {
            Some("comp") => ShaderStage::Compute,
            other => return Err(format!("unrecognized shader extension {:?} for {:?}", other, path)),
        };

        let glsl_code = load_glsl_and_resolve_includes(&path)?;
        let spirv = compile_glsl(&glsl_code, &relative_filename.to_string_lossy(), shader_stage)?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&relative_filename.to_string_lossy()),
            source: wgpu::ShaderSource::SpirV(std::borrow::Cow::Owned(spirv)),
        }))
    }
}
