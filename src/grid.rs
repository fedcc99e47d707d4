//! Grid store: a dense `gridSize^3` cell buffer set, one flat storage
//! buffer per attribute (momentum, mass, two velocity snapshots, neighbor
//! density, vorticity) rather than a handful of 3D textures, with a single
//! bind group layout built via `BindGroupLayoutBuilder`.

use crate::wgpu_utils::binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};
use crate::wgpu_utils::binding_glsl;

/// Per-cell momentum+mass accumulator, scattered into with fixed-point
/// `atomicAdd` emulation during the two P2G passes (`math::fixed_point_encode`).
/// Four `i32` lanes: `(momentum.x, momentum.y,
/// momentum.z, mass)`, all fixed-point encoded. Mirrored in
/// `shaders/common.glsl` as `CellAccum`.
pub const CELL_ACCUM_LANES: u64 = 4;

pub struct GridBuffers {
    pub grid_size: u32,
    cell_count: u32,

    /// Scatter target for K2 (P2G1: mass + momentum) and K3 (P2G2: stress
    /// contribution added into the same momentum lanes). Cleared to zero by
    /// K1 every (sub)step.
    pub accum: wgpu::Buffer,
    /// Mass-normalized cell velocity immediately after K2/K3, before K4
    /// applies gravity/force-fields/boundary. Read by G2P as the FLIP
    /// baseline (see the FLIP/PIC blend decision in DESIGN.md).
    pub velocity_transferred: wgpu::Buffer,
    /// Final cell velocity after grid-update. Read by G2P as the PIC sample
    /// and by the neighbor-density/vorticity passes.
    pub velocity: wgpu::Buffer,
    /// Scalar neighbor density per cell, written by the neighbor-density
    /// kernel, read by G2P's surface tension/cohesion term.
    pub neighbor_density: wgpu::Buffer,
    /// Curl of `velocity`, written by the vorticity-compute pass and
    /// consumed by the vorticity-confinement pass. Only meaningful when
    /// `vorticity_enabled` is set; otherwise left stale and unread.
    pub vorticity: wgpu::Buffer,
}

impl GridBuffers {
    pub fn cell_count(grid_size: u32) -> u32 {
        grid_size * grid_size * grid_size
    }

    pub fn new(device: &wgpu::Device, grid_size: u32) -> Self {
        let cell_count = Self::cell_count(grid_size);
        let vec3_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: cell_count as u64 * (std::mem::size_of::<f32>() as u64 * 4),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };

        let accum = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Buffer: Grid cell accum (momentum+mass, fixed point)"),
            size: cell_count as u64 * CELL_ACCUM_LANES * std::mem::size_of::<i32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let velocity_transferred = vec3_buffer("Buffer: Grid velocity (transferred, pre-force)");
        let velocity = vec3_buffer("Buffer: Grid velocity (final)");
        let neighbor_density = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Buffer: Grid neighbor density"),
            size: cell_count as u64 * std::mem::size_of::<f32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vorticity = vec3_buffer("Buffer: Grid vorticity");

        GridBuffers {
            grid_size,
            cell_count,
            accum,
            velocity_transferred,
            velocity,
            neighbor_density,
            vorticity,
        }
    }

    pub fn cell_count_u32(&self) -> u32 {
        self.cell_count
    }

    /// Layout shared by every kernel that touches the grid (K1-K7). Bindings
    /// are declared in buffer-field declaration order; `BindGroupBuilder`
    /// callers must add resources in the same order.
    pub fn bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
        BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .next_binding_compute(binding_glsl::buffer(false))
            .create(device, "BindGroupLayout: Grid")
    }

    pub fn create_bind_group(&self, device: &wgpu::Device, layout: &BindGroupLayoutWithDesc) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .buffer(&self.accum)
            .buffer(&self.velocity_transferred)
            .buffer(&self.velocity)
            .buffer(&self.neighbor_density)
            .buffer(&self.vorticity)
            .create(device, "BindGroup: Grid")
    }
}
