//! GPU-visible uniform layouts shared by every kernel, covering the larger
//! per-step parameter set MLS-MPM needs. Kept in their own module since
//! both `driver.rs` and
//! `shaders/common.glsl` must agree on the exact field order.

use crate::force_field::{ForceFieldGpu, MAX_FORCE_FIELDS};
use crate::material::MaterialParams;

/// Per-(sub)step scalar uniforms. Mirrors `shaders/common.glsl`'s
/// `SimulationUniforms` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimulationUniforms {
    pub dt: f32,
    pub grid_size: u32,
    pub particle_count: u32,
    pub active_material: u32,

    pub gravity: [f32; 3],
    pub flip_ratio: f32,

    pub transfer_mode: u32,
    pub vorticity_enabled: u32,
    pub vorticity_epsilon: f32,
    pub surface_tension_enabled: u32,

    pub surface_tension_coeff: f32,
    pub active_force_field_count: u32,
    pub boundary_kind: u32,
    pub collision_mode: u32,

    pub boundary_center: [f32; 3],
    pub boundary_stiffness: f32,

    pub boundary_params: [f32; 4], // shape-specific: half-extents, or (radius, height, 0, 0), etc.
    pub boundary_axis: [f32; 3],
    pub boundary_thickness: f32,

    pub boundary_restitution: f32,
    pub boundary_friction: f32,

    pub gravity_mode: u32,
    pub gravity_strength: f32,
}

/// Up to `MAX_FORCE_FIELDS` active fields, padded to a fixed-size array so the
/// uniform buffer never needs resizing. Mirrors
/// `shaders/common.glsl`'s `ForceFieldBlock`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ForceFieldsUniform {
    pub fields: [ForceFieldGpu; MAX_FORCE_FIELDS],
}

impl Default for ForceFieldsUniform {
    fn default() -> Self {
        ForceFieldsUniform {
            fields: [ForceFieldGpu {
                position: [0.0; 3],
                kind: 0,
                axis: [0.0, 1.0, 0.0],
                strength: 0.0,
                radius: 1.0,
                falloff: 0,
                height: 0.0,
                _padding: 0.0,
            }; MAX_FORCE_FIELDS],
        }
    }
}

/// One constant block per material id. Mirrors
/// `shaders/common.glsl`'s `MaterialTable`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialTableUniform {
    pub materials: [MaterialParams; crate::material::MaterialId::COUNT],
}
