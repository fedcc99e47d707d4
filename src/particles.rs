//! Particle store: GPU-resident SoA particle attribute
//! buffers, seeded with a stratified-jitter pattern (`PARTICLES_PER_GRID_CELL
//! = 8` particles per cell) generalized from "position only" to the full
//! MLS-MPM particle state:
//! position, velocity, affine momentum `C`, deformation gradient `F`,
//! density, material id, age, and lifetime.

use crate::error::{Result, SolverError};
use crate::material::MaterialId;
use crate::wgpu_utils::binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};
use crate::wgpu_utils::binding_glsl;
use cgmath::{Matrix3, Point3, Vector3};
use rand::Rng;

/// Particles are distributed `PARTICLES_PER_GRID_CELL` per cell at reset
/// time; eight per cell is a widely used default for MPM-style solvers.
pub const PARTICLES_PER_GRID_CELL: u32 = 8;

/// Mirrors a 3x3 matrix (`C` or `F`) as three padded `vec4`s, the layout
/// `shaders/common.glsl` reads as `mat3` with std430 column padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mat3Gpu {
    pub cols: [[f32; 4]; 3],
}

impl From<Matrix3<f32>> for Mat3Gpu {
    fn from(m: Matrix3<f32>) -> Self {
        Mat3Gpu {
            cols: [[m.x.x, m.x.y, m.x.z, 0.0], [m.y.x, m.y.y, m.y.z, 0.0], [m.z.x, m.z.y, m.z.z, 0.0]],
        }
    }
}

impl Mat3Gpu {
    pub fn identity() -> Self {
        Matrix3::from_diagonal(Vector3::new(1.0, 1.0, 1.0)).into()
    }

    pub fn zero() -> Self {
        Mat3Gpu { cols: [[0.0; 4]; 3] }
    }
}

/// Per-particle scalar bundle that doesn't warrant its own buffer: density
/// (for surface tension/cohesion sampling), material id, age
/// (seconds since spawn) and lifetime (seconds; `<= 0.0` means immortal).
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleMisc {
    pub density: f32,
    pub material_id: u32,
    pub age: f32,
    pub lifetime: f32,
}

/// Where `reset` seeds new particles (`reset(count, initialDistribution)`).
#[derive(Clone, Copy, Debug)]
pub enum InitialDistribution {
    /// Axis-aligned block in grid-space cell coordinates, stratified 2x2x2
    /// jitter per cell.
    Cube { min: Point3<f32>, max: Point3<f32> },
    /// Sphere of the given radius centered at `center`, rejection-sampled
    /// per candidate cell.
    Sphere { center: Point3<f32>, radius: f32 },
}

/// Selects a single particle attribute buffer via [`ParticleBuffers::attribute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleAttribute {
    Position,
    Velocity,
    AffineC,
    DeformationF,
    Misc,
}

/// Renderer-facing read-only view onto the live particle buffers, borrowed
/// from a [`ParticleBuffers`]. Renderers bind these directly into their own
/// pipelines between `step` calls; nothing here maps or copies data.
pub struct ParticleView<'a> {
    pub position: &'a wgpu::Buffer,
    pub velocity: &'a wgpu::Buffer,
    pub affine_c: &'a wgpu::Buffer,
    pub deformation_f: &'a wgpu::Buffer,
    pub misc: &'a wgpu::Buffer,
    pub particle_count: u32,
}

pub struct ParticleBuffers {
    pub max_particles: u32,
    active_count: u32,

    pub position: wgpu::Buffer,
    pub velocity: wgpu::Buffer,
    pub affine_c: wgpu::Buffer,
    pub deformation_f: wgpu::Buffer,
    pub misc: wgpu::Buffer,
}

impl ParticleBuffers {
    pub fn new(device: &wgpu::Device, max_particles: u32) -> Self {
        let vec3_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: max_particles as u64 * (std::mem::size_of::<f32>() as u64 * 4),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        let mat3_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: max_particles as u64 * std::mem::size_of::<Mat3Gpu>() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };

        ParticleBuffers {
            max_particles,
            active_count: 0,
            position: vec3_buffer("Buffer: Particles position"),
            velocity: vec3_buffer("Buffer: Particles velocity"),
            affine_c: mat3_buffer("Buffer: Particles affine C"),
            deformation_f: mat3_buffer("Buffer: Particles deformation F"),
            misc: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Buffer: Particles misc (density/material/age/lifetime)"),
                size: max_particles as u64 * std::mem::size_of::<ParticleMisc>() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }),
        }
    }

    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    pub(crate) fn set_active_count(&mut self, count: u32) {
        self.active_count = count;
    }

    pub fn view(&self) -> ParticleView<'_> {
        ParticleView {
            position: &self.position,
            velocity: &self.velocity,
            affine_c: &self.affine_c,
            deformation_f: &self.deformation_f,
            misc: &self.misc,
            particle_count: self.active_count,
        }
    }

    pub fn attribute(&self, attribute: ParticleAttribute) -> &wgpu::Buffer {
        match attribute {
            ParticleAttribute::Position => &self.position,
            ParticleAttribute::Velocity => &self.velocity,
            ParticleAttribute::AffineC => &self.affine_c,
            ParticleAttribute::DeformationF => &self.deformation_f,
            ParticleAttribute::Misc => &self.misc,
        }
    }

    /// Re-seeds the store with exactly `count` particles drawn from
    /// `distribution`, discarding any previously active particles.
    /// `material` tags every seeded particle; `F` starts at
    /// identity, `C` and velocity start at zero.
    pub fn reset(&mut self, queue: &wgpu::Queue, count: u32, distribution: InitialDistribution, material: MaterialId, seed: u64) -> Result<()> {
        if count > self.max_particles {
            return Err(SolverError::ResourceExhaustion(format!(
                "reset requested {} particles, buffer capacity is {}",
                count, self.max_particles
            )));
        }

        let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(seed);
        let positions = seed_positions(&distribution, count, &mut rng);
        debug_assert_eq!(positions.len(), count as usize);

        let position_data: Vec<[f32; 4]> = positions.iter().map(|p| [p.x, p.y, p.z, 0.0]).collect();
        let zero_vec3 = vec![[0.0f32; 4]; count as usize];
        let identity_mat3 = vec![Mat3Gpu::identity(); count as usize];
        let zero_mat3 = vec![Mat3Gpu::zero(); count as usize];
        let misc = vec![
            ParticleMisc {
                density: 0.0,
                material_id: material.as_index(),
                age: 0.0,
                lifetime: 0.0,
            };
            count as usize
        ];

        queue.write_buffer(&self.position, 0, bytemuck::cast_slice(&position_data));
        queue.write_buffer(&self.velocity, 0, bytemuck::cast_slice(&zero_vec3));
        queue.write_buffer(&self.affine_c, 0, bytemuck::cast_slice(&zero_mat3));
        queue.write_buffer(&self.deformation_f, 0, bytemuck::cast_slice(&identity_mat3));
        queue.write_buffer(&self.misc, 0, bytemuck::cast_slice(&misc));

        self.active_count = count;
        log::info!("reset particle store with {} particles ({:?})", count, material);
        Ok(())
    }

    pub fn bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
        BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .create(device, "BindGroupLayout: Particles")
    }

    pub fn create_bind_group(&self, device: &wgpu::Device, layout: &BindGroupLayoutWithDesc) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .buffer(&self.position)
            .buffer(&self.velocity)
            .buffer(&self.affine_c)
            .buffer(&self.deformation_f)
            .buffer(&self.misc)
            .create(device, "BindGroup: Particles")
    }
}

fn seed_positions(distribution: &InitialDistribution, count: u32, rng: &mut rand::rngs::SmallRng) -> Vec<Point3<f32>> {
    match *distribution {
        InitialDistribution::Cube { min, max } => {
            let extent = Vector3::new((max.x - min.x).max(1.0), (max.y - min.y).max(1.0), (max.z - min.z).max(1.0));
            let cells_x = extent.x.ceil() as u32;
            let cells_y = extent.y.ceil() as u32;
            (0..count)
                .map(|i| {
                    let cell = Point3::new(
                        (i / PARTICLES_PER_GRID_CELL % cells_x) as f32,
                        (i / PARTICLES_PER_GRID_CELL / cells_x % cells_y) as f32,
                        (i / PARTICLES_PER_GRID_CELL / cells_x / cells_y) as f32,
                    );
                    let sample_idx = i % PARTICLES_PER_GRID_CELL;
                    let stratified = Vector3::new((sample_idx % 2) as f32, (sample_idx / 2 % 2) as f32, (sample_idx / 4 % 2) as f32) * 0.5;
                    let jitter = Vector3::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>()) * 0.5;
                    min + (Vector3::new(cell.x, cell.y, cell.z) + stratified + jitter)
                })
                .collect()
        }
        InitialDistribution::Sphere { center, radius } => (0..count)
            .map(|_| {
                loop {
                    let candidate = Vector3::new(rng.gen::<f32>() * 2.0 - 1.0, rng.gen::<f32>() * 2.0 - 1.0, rng.gen::<f32>() * 2.0 - 1.0);
                    if candidate.x * candidate.x + candidate.y * candidate.y + candidate.z * candidate.z <= 1.0 {
                        break center + candidate * radius;
                    }
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_distribution_seeds_within_bounds() {
        let min = Point3::new(0.0, 0.0, 0.0);
        let max = Point3::new(4.0, 4.0, 4.0);
        let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(7);
        let positions = seed_positions(&InitialDistribution::Cube { min, max }, 64, &mut rng);
        assert_eq!(positions.len(), 64);
        for p in positions {
            assert!(p.x >= min.x - 1e-3 && p.x <= max.x + 1.0);
            assert!(p.y >= min.y - 1e-3 && p.y <= max.y + 1.0);
            assert!(p.z >= min.z - 1e-3 && p.z <= max.z + 1.0);
        }
    }

    #[test]
    fn sphere_distribution_stays_within_radius() {
        let center = Point3::new(10.0, 10.0, 10.0);
        let radius = 5.0;
        let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(3);
        let positions = seed_positions(&InitialDistribution::Sphere { center, radius }, 32, &mut rng);
        for p in positions {
            let d = (p - center).x.powi(2) + (p - center).y.powi(2) + (p - center).z.powi(2);
            assert!(d.sqrt() <= radius + 1e-3);
        }
    }

    #[test]
    fn mat3_identity_roundtrips_diagonal() {
        let m = Mat3Gpu::identity();
        assert_eq!(m.cols[0][0], 1.0);
        assert_eq!(m.cols[1][1], 1.0);
        assert_eq!(m.cols[2][2], 1.0);
        assert_eq!(m.cols[0][1], 0.0);
    }
}
