//! GPU-accelerated MLS-MPM material-point fluid/solid solver.
//!
//! Built on a wgpu compute-shader pipeline architecture, this crate
//! implements a full APIC/MLS-MPM material-point solver supporting multiple
//! constitutive models (fluid, elastic, sand, snow, foam, viscous, rigid,
//! plasma), force fields, adaptive CFL-limited sub-stepping, and boundary
//! shapes.
//!
//! The crate owns no window, renderer, or host shell: embedders create a
//! [`wgpu::Device`]/[`wgpu::Queue`] themselves (headless or windowed) and
//! drive [`Simulator::step`] from their own loop.

mod boundary;
mod config;
mod driver;
mod error;
mod force_field;
mod grid;
pub mod math;
mod material;
mod metrics;
mod particles;
mod reference;
mod scheduler;
mod snapshot;
mod uniforms;
mod wgpu_utils;

pub use boundary::{BoundaryDescriptor, BoundaryShape};
pub use config::{ColorModeTag, ConfigPatch, GravityMode, SimConfig, TransferMode};
pub use driver::{default_shader_dir, Simulator};
pub use error::{Result, SolverError};
pub use force_field::{FieldDescriptor, FieldKind, ForceFieldRegistry, MAX_FORCE_FIELDS};
pub use material::MaterialId;
pub use math::{CollisionMode, Falloff};
pub use metrics::Metrics;
pub use particles::{InitialDistribution, ParticleAttribute, ParticleView};

use std::path::Path;
use std::rc::Rc;

/// Constructs a [`Simulator`] against an already-initialized `device`/`queue`
/// pair, loading kernels from `shader_dir` (see [`default_shader_dir`] for
/// the crate-relative default used by the bundled demo).
pub fn new_simulator(device: Rc<wgpu::Device>, queue: Rc<wgpu::Queue>, shader_dir: &Path, config: SimConfig) -> Result<Simulator> {
    Simulator::new(device, queue, shader_dir, config)
}
