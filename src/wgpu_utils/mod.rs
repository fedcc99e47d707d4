pub mod binding_builder;
pub mod binding_glsl;
pub mod pipelines;
pub mod readback;
pub mod shader;
pub mod uniformbuffer;

/// Rounds `global_size` up to a whole number of `local_size`-sized workgroups
/// per axis. Called before every `dispatch_workgroups`.
pub fn compute_group_size(global_size: wgpu::Extent3d, local_size: wgpu::Extent3d) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: (global_size.width + local_size.width - 1) / local_size.width,
        height: (global_size.height + local_size.height - 1) / local_size.height,
        depth_or_array_layers: (global_size.depth_or_array_layers + local_size.depth_or_array_layers - 1) / local_size.depth_or_array_layers,
    }
}

/// 1D variant used for the particle-indexed kernels (K2, K3, K5, K7).
pub fn compute_group_size_1d(global_size: u32, local_size: u32) -> u32 {
    (global_size + local_size - 1) / local_size
}

/// Cubic-grid variant used by the grid-indexed kernels; returns the
/// workgroup count along a single axis since the grid is always cubic.
pub fn compute_group_size_3d(grid_size: u32, local_size: u32) -> u32 {
    compute_group_size_1d(grid_size, local_size)
}
