//! Simulation driver: the orchestrator that owns every GPU resource and
//! drives the clear/P2G/grid-update/G2P kernel sequence each sub-step from
//! one bind-group-per-pass compute pass, with pause/config-patch/restart
//! bookkeeping layered on top.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::boundary::{BoundaryDescriptor, BoundaryShape};
use crate::config::{SimConfig, TransferMode};
use crate::error::{Result, SolverError};
use crate::force_field::{FieldDescriptor, ForceFieldGpu, ForceFieldRegistry, MAX_FORCE_FIELDS};
use crate::grid::GridBuffers;
use crate::material::MaterialParams;
use crate::metrics::Metrics;
use crate::particles::{InitialDistribution, Mat3Gpu, ParticleAttribute, ParticleBuffers, ParticleMisc, ParticleView};
use crate::scheduler::Scheduler;
use crate::snapshot::{ParticleSnapshot, Snapshot};
use crate::uniforms::{ForceFieldsUniform, MaterialTableUniform, SimulationUniforms};
use crate::wgpu_utils::binding_builder::BindGroupLayoutWithDesc;
use crate::wgpu_utils::pipelines::{ComputePipelineCreationDesc, ComputePipelineHandle, PipelineManager};
use crate::wgpu_utils::readback::read_buffer_blocking;
use crate::wgpu_utils::shader::ShaderDirectory;
use crate::wgpu_utils::uniformbuffer::UniformBuffer;
use crate::wgpu_utils::{compute_group_size_1d, compute_group_size_3d};

const COMPUTE_LOCAL_SIZE_GRID: u32 = 4; // 4^3 = 64 threads/workgroup, grid kernels
const COMPUTE_LOCAL_SIZE_PARTICLES: u32 = 64;
/// Upper bound on how many particles `sample_v_max` gathers per resample.
const V_MAX_SAMPLE_COUNT: u32 = 256;

struct Kernels {
    clear_grid: ComputePipelineHandle,
    p2g1: ComputePipelineHandle,
    p2g2: ComputePipelineHandle,
    grid_update: ComputePipelineHandle,
    neighbor_density: ComputePipelineHandle,
    vorticity_compute: ComputePipelineHandle,
    vorticity_confine: ComputePipelineHandle,
    g2p: ComputePipelineHandle,
}

/// The public simulator handle. Owns the device
/// queue references, every GPU buffer, and the host-side bookkeeping
/// (config, force fields, boundary, scheduler, metrics).
pub struct Simulator {
    device: Rc<wgpu::Device>,
    queue: Rc<wgpu::Queue>,

    shader_dir: ShaderDirectory,
    pipeline_manager: PipelineManager,
    kernels: Kernels,

    grid_layout: BindGroupLayoutWithDesc,

    sim_uniforms_buffer: UniformBuffer<SimulationUniforms>,
    force_fields_buffer: UniformBuffer<ForceFieldsUniform>,
    material_table_buffer: UniformBuffer<MaterialTableUniform>,
    uniforms_bind_group: wgpu::BindGroup,

    grid: GridBuffers,
    grid_bind_group: wgpu::BindGroup,
    particles: ParticleBuffers,
    particles_bind_group: wgpu::BindGroup,

    config: SimConfig,
    force_fields: ForceFieldRegistry,
    boundary: BoundaryDescriptor,
    scheduler: Scheduler,
    metrics: Metrics,

    paused: bool,
}

impl Simulator {
    pub fn new(device: Rc<wgpu::Device>, queue: Rc<wgpu::Queue>, shader_dir_path: &Path, config: SimConfig) -> Result<Self> {
        config.validate()?;

        let shader_dir = ShaderDirectory::new(shader_dir_path);
        let mut pipeline_manager = PipelineManager::new();

        let uniforms_layout = build_uniforms_layout(&device);
        let grid_layout = GridBuffers::bind_group_layout(&device);
        let particles_layout = ParticleBuffers::bind_group_layout(&device);

        let grid_only_layout = Rc::new(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PipelineLayout: grid-only kernels"),
            bind_group_layouts: &[&uniforms_layout.layout, &grid_layout.layout],
            push_constant_ranges: &[],
        }));
        let full_layout = Rc::new(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PipelineLayout: grid+particle kernels"),
            bind_group_layouts: &[&uniforms_layout.layout, &grid_layout.layout, &particles_layout.layout],
            push_constant_ranges: &[],
        }));

        let kernels = Kernels {
            clear_grid: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K1: clear grid", grid_only_layout.clone(), Path::new("clear_grid.comp")),
            ),
            p2g1: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K2: P2G1 (mass+momentum)", full_layout.clone(), Path::new("p2g1.comp")),
            ),
            p2g2: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K3: P2G2 (stress)", full_layout.clone(), Path::new("p2g2.comp")),
            ),
            grid_update: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K4: grid update", grid_only_layout.clone(), Path::new("grid_update.comp")),
            ),
            neighbor_density: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K5: neighbor density", full_layout.clone(), Path::new("neighbor_density.comp")),
            ),
            vorticity_compute: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K6a: vorticity compute", grid_only_layout.clone(), Path::new("vorticity_compute.comp")),
            ),
            vorticity_confine: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K6b: vorticity confine", grid_only_layout.clone(), Path::new("vorticity_confine.comp")),
            ),
            g2p: pipeline_manager.create_compute_pipeline(
                &device,
                &shader_dir,
                ComputePipelineCreationDesc::new("K7: G2P", full_layout, Path::new("g2p.comp")),
            ),
        };

        let sim_uniforms_buffer = UniformBuffer::new(&device);
        let force_fields_buffer = UniformBuffer::new(&device);
        let material_table_buffer = UniformBuffer::new(&device);
        let uniforms_bind_group = crate::wgpu_utils::binding_builder::BindGroupBuilder::new(&uniforms_layout)
            .resource(sim_uniforms_buffer.binding_resource())
            .resource(force_fields_buffer.binding_resource())
            .resource(material_table_buffer.binding_resource())
            .create(&device, "BindGroup: uniforms");

        let grid = GridBuffers::new(&device, config.grid_size);
        let grid_bind_group = grid.create_bind_group(&device, &grid_layout);
        let particles = ParticleBuffers::new(&device, config.particle_count);
        let particles_bind_group = particles.create_bind_group(&device, &particles_layout);

        material_table_buffer.update_content(
            &queue,
            MaterialTableUniform {
                materials: MaterialParams::table_from_config(config.stiffness, config.dynamic_viscosity, config.rest_density),
            },
        );

        let scheduler = Scheduler::new(config.cfl_target, config.max_substeps, config.adaptive_timestep);

        log::info!(
            "constructed simulator: grid_size={}, particle_capacity={}",
            config.grid_size,
            config.particle_count
        );

        Ok(Simulator {
            device,
            queue,
            shader_dir,
            pipeline_manager,
            kernels,
            grid_layout,
            sim_uniforms_buffer,
            force_fields_buffer,
            material_table_buffer,
            uniforms_bind_group,
            grid,
            grid_bind_group,
            particles,
            particles_bind_group,
            config,
            force_fields: ForceFieldRegistry::default(),
            boundary: BoundaryDescriptor::default(),
            scheduler,
            metrics: Metrics::default(),
            paused: false,
        })
    }

    /// Re-seeds the particle store. Any velocity,
    /// `C`/`F` history, and the grid's previous-frame state are discarded.
    pub fn reset(&mut self, count: u32, distribution: InitialDistribution, seed: u64) -> Result<()> {
        self.particles.reset(&self.queue, count, distribution, self.config.material_type, seed)?;
        self.metrics = Metrics::default();
        Ok(())
    }

    pub fn set_config(&mut self, patch: crate::config::ConfigPatch) -> Result<()> {
        let next = patch.apply(&self.config)?;
        if next.grid_size != self.config.grid_size {
            self.grid = GridBuffers::new(&self.device, next.grid_size);
            self.grid_bind_group = self.grid.create_bind_group(&self.device, &self.grid_layout);
        }
        if next.particle_count != self.config.particle_count {
            return Err(SolverError::ConfigInvalid(
                "particleCount cannot be changed by set_config; call reset() with a new count instead".into(),
            ));
        }
        self.material_table_buffer.update_content(
            &self.queue,
            MaterialTableUniform {
                materials: MaterialParams::table_from_config(next.stiffness, next.dynamic_viscosity, next.rest_density),
            },
        );
        self.scheduler.set_cfl_target(next.cfl_target);
        self.scheduler.set_max_substeps(next.max_substeps);
        self.scheduler.set_adaptive(next.adaptive_timestep);
        self.config = next;
        log::info!("config patch applied");
        Ok(())
    }

    pub fn set_force_fields(&mut self, fields: &[FieldDescriptor]) -> Result<()> {
        self.force_fields.set(fields)
    }

    pub fn set_boundary(&mut self, boundary: BoundaryDescriptor) {
        self.boundary = boundary;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn particle_count(&self) -> u32 {
        self.particles.active_count()
    }

    /// Renderer-facing read-only handle onto every live particle buffer.
    /// Valid between `step` calls; a `reset`/`load_snapshot` that resizes
    /// the particle store invalidates any view taken before it.
    pub fn particle_readonly_view(&self) -> ParticleView<'_> {
        self.particles.view()
    }

    /// Renderer-facing read-only handle onto a single particle attribute
    /// buffer, for embedders that only need e.g. position and velocity.
    pub fn attribute_view(&self, attribute: ParticleAttribute) -> &wgpu::Buffer {
        self.particles.attribute(attribute)
    }

    /// Serializes the full resumable state (config, boundary, force fields,
    /// particle attributes) to a binary blob.
    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            config: self.config.clone(),
            boundary: self.boundary,
            force_fields: self.force_fields.active().to_vec(),
            particles: self.readback_particles_blocking(),
        };
        snapshot.to_bytes()
    }

    /// Restores state previously produced by [`Simulator::save_snapshot`].
    /// Grid buffers are resized if the snapshot's `gridSize` differs from the
    /// current one; particle buffers are re-uploaded wholesale.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> Result<()> {
        let snapshot = Snapshot::from_bytes(bytes)?;
        snapshot.config.validate()?;

        if snapshot.config.grid_size != self.config.grid_size {
            self.grid = GridBuffers::new(&self.device, snapshot.config.grid_size);
            self.grid_bind_group = self.grid.create_bind_group(&self.device, &self.grid_layout);
        }
        if snapshot.particles.particle_count() as u32 > self.particles.max_particles {
            return Err(SolverError::ResourceExhaustion(format!(
                "snapshot has {} particles, capacity is {}",
                snapshot.particles.particle_count(),
                self.particles.max_particles
            )));
        }

        self.upload_particles(&snapshot.particles);
        self.force_fields.set(&snapshot.force_fields)?;
        self.boundary = snapshot.boundary;
        self.material_table_buffer.update_content(
            &self.queue,
            MaterialTableUniform {
                materials: MaterialParams::table_from_config(
                    snapshot.config.stiffness,
                    snapshot.config.dynamic_viscosity,
                    snapshot.config.rest_density,
                ),
            },
        );
        self.scheduler = Scheduler::new(snapshot.config.cfl_target, snapshot.config.max_substeps, snapshot.config.adaptive_timestep);
        self.config = snapshot.config;
        self.metrics = Metrics::default();
        log::info!("restored simulator from snapshot ({} particles)", self.particles.active_count());
        Ok(())
    }

    /// Reads every particle attribute back to the host. Not part of the
    /// renderer-facing API; used by [`Simulator::save_snapshot`] and by
    /// integration tests that need post-step particle state.
    pub(crate) fn readback_particles_blocking(&self) -> ParticleSnapshot {
        let count = self.particles.active_count() as usize;
        let positions: Vec<[f32; 4]> = read_buffer_blocking(&self.device, &self.queue, &self.particles.position, count);
        let velocities: Vec<[f32; 4]> = read_buffer_blocking(&self.device, &self.queue, &self.particles.velocity, count);
        let affine_c: Vec<Mat3Gpu> = read_buffer_blocking(&self.device, &self.queue, &self.particles.affine_c, count);
        let deformation_f: Vec<Mat3Gpu> = read_buffer_blocking(&self.device, &self.queue, &self.particles.deformation_f, count);
        let misc: Vec<ParticleMisc> = read_buffer_blocking(&self.device, &self.queue, &self.particles.misc, count);

        ParticleSnapshot {
            positions: positions.iter().map(|p| [p[0], p[1], p[2]]).collect(),
            velocities: velocities.iter().map(|v| [v[0], v[1], v[2]]).collect(),
            affine_c: affine_c.iter().map(mat3_gpu_to_rows).collect(),
            deformation_f: deformation_f.iter().map(mat3_gpu_to_rows).collect(),
            density: misc.iter().map(|m| m.density).collect(),
            material_id: misc.iter().map(|m| m.material_id).collect(),
            age: misc.iter().map(|m| m.age).collect(),
            lifetime: misc.iter().map(|m| m.lifetime).collect(),
        }
    }

    fn upload_particles(&mut self, snapshot: &ParticleSnapshot) {
        let count = snapshot.particle_count();
        let positions: Vec<[f32; 4]> = snapshot.positions.iter().map(|p| [p[0], p[1], p[2], 0.0]).collect();
        let velocities: Vec<[f32; 4]> = snapshot.velocities.iter().map(|v| [v[0], v[1], v[2], 0.0]).collect();
        let affine_c: Vec<Mat3Gpu> = snapshot.affine_c.iter().map(rows_to_mat3_gpu).collect();
        let deformation_f: Vec<Mat3Gpu> = snapshot.deformation_f.iter().map(rows_to_mat3_gpu).collect();
        let misc: Vec<ParticleMisc> = (0..count)
            .map(|i| ParticleMisc {
                density: snapshot.density[i],
                material_id: snapshot.material_id[i],
                age: snapshot.age[i],
                lifetime: snapshot.lifetime[i],
            })
            .collect();

        self.queue.write_buffer(&self.particles.position, 0, bytemuck::cast_slice(&positions));
        self.queue.write_buffer(&self.particles.velocity, 0, bytemuck::cast_slice(&velocities));
        self.queue.write_buffer(&self.particles.affine_c, 0, bytemuck::cast_slice(&affine_c));
        self.queue.write_buffer(&self.particles.deformation_f, 0, bytemuck::cast_slice(&deformation_f));
        self.queue.write_buffer(&self.particles.misc, 0, bytemuck::cast_slice(&misc));
        self.particles.set_active_count(count as u32);
    }

    /// Advances the simulation by `dt_hint` seconds of host (not necessarily
    /// wall-clock) time, splitting it into CFL-safe sub-steps, and returns
    /// the `dt` actually used per sub-step. A no-op returning `Ok(0.0)`
    /// while paused.
    pub fn step(&mut self, dt_hint: f32) -> Result<f32> {
        if self.paused {
            return Ok(0.0);
        }
        if self.shader_dir.detected_change() {
            self.pipeline_manager.try_reload_shaders(&self.device, &self.shader_dir);
        }

        self.force_fields.advance(dt_hint);

        if self.scheduler.needs_v_max_resample() {
            let v_max = self.sample_v_max();
            self.scheduler.record_v_max(v_max);
            self.metrics.v_max_last_frame = v_max;
        }
        let plan = self.scheduler.plan(dt_hint * self.config.speed);

        for _ in 0..plan.substep_count {
            self.substep(plan.dt_per_substep)?;
        }

        if plan.overran {
            self.metrics.record_overrun();
        }
        self.metrics.substeps_last_frame = plan.substep_count;
        self.metrics.dt_used_last_frame = plan.dt_per_substep;
        Ok(plan.dt_per_substep)
    }

    /// Cheap periodic estimate of `max(|velocity|)`: gathers every `stride`-th
    /// particle's velocity into a small staging buffer instead of reading the
    /// whole buffer back, then takes the max on the host. Called on the
    /// scheduler's resample cadence, not every step, since it blocks on the
    /// GPU.
    fn sample_v_max(&self) -> f32 {
        let count = self.particles.active_count();
        if count == 0 {
            return 0.0;
        }
        let samples = V_MAX_SAMPLE_COUNT.min(count);
        let stride = (count / samples).max(1);
        let vec4_size = std::mem::size_of::<[f32; 4]>() as u64;

        let gather = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Buffer: v_max sample gather"),
            size: samples as u64 * vec4_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Encoder: v_max sample gather"),
        });
        for i in 0..samples {
            let particle_idx = (i * stride).min(count - 1);
            encoder.copy_buffer_to_buffer(&self.particles.velocity, particle_idx as u64 * vec4_size, &gather, i as u64 * vec4_size, vec4_size);
        }
        self.queue.submit(Some(encoder.finish()));

        let velocities: Vec<[f32; 4]> = read_buffer_blocking(&self.device, &self.queue, &gather, samples as usize);
        velocities
            .iter()
            .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
            .fold(0.0f32, f32::max)
    }

    fn substep(&mut self, dt: f32) -> Result<()> {
        self.upload_uniforms(dt);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Simulator::substep"),
        });

        let grid_groups = compute_group_size_3d(self.config.grid_size, COMPUTE_LOCAL_SIZE_GRID);
        let particle_groups = compute_group_size_1d(self.particles.active_count(), COMPUTE_LOCAL_SIZE_PARTICLES);

        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("K1-K4: transfer + update"),
                timestamp_writes: None,
            });
            cpass.set_bind_group(0, &self.uniforms_bind_group, &[]);
            cpass.set_bind_group(1, &self.grid_bind_group, &[]);

            cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.clear_grid));
            cpass.dispatch_workgroups(grid_groups, grid_groups, grid_groups);

            cpass.set_bind_group(2, &self.particles_bind_group, &[]);
            cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.p2g1));
            cpass.dispatch_workgroups(particle_groups, 1, 1);

            cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.p2g2));
            cpass.dispatch_workgroups(particle_groups, 1, 1);

            cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.grid_update));
            cpass.dispatch_workgroups(grid_groups, grid_groups, grid_groups);

            if self.config.surface_tension_enabled {
                cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.neighbor_density));
                cpass.dispatch_workgroups(particle_groups, 1, 1);
            }

            if self.config.vorticity_enabled {
                cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.vorticity_compute));
                cpass.dispatch_workgroups(grid_groups, grid_groups, grid_groups);
                cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.vorticity_confine));
                cpass.dispatch_workgroups(grid_groups, grid_groups, grid_groups);
            }

            cpass.set_pipeline(self.pipeline_manager.get_compute(&self.kernels.g2p));
            cpass.dispatch_workgroups(particle_groups, 1, 1);
        }

        self.queue.submit(Some(encoder.finish()));
        self.device.poll(wgpu::Maintain::Poll);
        Ok(())
    }

    fn upload_uniforms(&mut self, dt: f32) {
        let gravity = gravity_vector(&self.config);
        let active_fields: Vec<FieldDescriptor> = self.force_fields.active().to_vec();
        let mut ff_uniform = ForceFieldsUniform::default();
        for (slot, field) in ff_uniform.fields.iter_mut().zip(active_fields.iter()).take(MAX_FORCE_FIELDS) {
            *slot = (*field).into();
        }

        let (boundary_kind, boundary_params, boundary_axis) = encode_boundary_shape(&self.boundary.shape, self.config.grid_size);

        let uniforms = SimulationUniforms {
            dt,
            grid_size: self.config.grid_size,
            particle_count: self.particles.active_count(),
            active_material: self.config.material_type.as_index(),
            gravity,
            flip_ratio: self.config.flip_ratio,
            transfer_mode: match self.config.transfer_mode {
                TransferMode::Pic => 0,
                TransferMode::Flip => 1,
                TransferMode::Hybrid => 2,
            },
            vorticity_enabled: self.config.vorticity_enabled as u32,
            vorticity_epsilon: self.config.vorticity_epsilon,
            surface_tension_enabled: self.config.surface_tension_enabled as u32,
            surface_tension_coeff: self.config.surface_tension_coeff,
            active_force_field_count: active_fields.len() as u32,
            boundary_kind,
            collision_mode: match self.boundary.collision_mode {
                crate::math::CollisionMode::Reflect => 0,
                crate::math::CollisionMode::Clamp => 1,
                crate::math::CollisionMode::Wrap => 2,
                crate::math::CollisionMode::Kill => 3,
            },
            boundary_center: [self.config.grid_size as f32 * 0.5; 3],
            boundary_stiffness: self.boundary.stiffness,
            boundary_params,
            boundary_axis,
            boundary_thickness: self.boundary.thickness,
            boundary_restitution: self.boundary.restitution,
            boundary_friction: self.boundary.friction,
            gravity_mode: gravity_mode_index(self.config.gravity_mode),
            gravity_strength: self.config.gravity_strength,
        };

        self.sim_uniforms_buffer.update_content(&self.queue, uniforms);
        self.force_fields_buffer.update_content(&self.queue, ff_uniform);
    }
}

fn gravity_vector(config: &SimConfig) -> [f32; 3] {
    use crate::config::GravityMode;
    match config.gravity_mode {
        GravityMode::DownZ => [0.0, 0.0, -config.gravity_strength],
        GravityMode::BackZ => [0.0, 0.0, config.gravity_strength],
        // Direction varies per cell (pulls toward boundaryCenter); grid_update.comp
        // derives it from gravityMode/gravityStrength instead of this vector.
        GravityMode::CenterRadial => [0.0, 0.0, 0.0],
        GravityMode::DeviceSensor => [0.0, -config.gravity_strength, 0.0], // host overrides via future API; default down-Y
    }
}

fn gravity_mode_index(mode: crate::config::GravityMode) -> u32 {
    use crate::config::GravityMode;
    match mode {
        GravityMode::DownZ => 0,
        GravityMode::BackZ => 1,
        GravityMode::CenterRadial => 2,
        GravityMode::DeviceSensor => 3,
    }
}

/// Encodes a boundary shape's kind/params/axis for upload. `grid_size` lets
/// `Viewport` derive concrete half-extents from its aspect ratio the same
/// way `boundary.rs::signed_distance` does for the CPU path: full half-extent
/// on y/z, scaled by `aspect` on x.
fn encode_boundary_shape(shape: &BoundaryShape, grid_size: u32) -> (u32, [f32; 4], [f32; 3]) {
    match *shape {
        BoundaryShape::Viewport { aspect } => {
            let half = (grid_size as f32 * 0.5).max(1.0);
            (0, [half * aspect.max(0.01), half, half, 0.0], [0.0, 1.0, 0.0])
        }
        BoundaryShape::Box { half_extents } => (1, [half_extents.x, half_extents.y, half_extents.z, 0.0], [0.0, 1.0, 0.0]),
        BoundaryShape::Sphere { radius } => (2, [radius, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        BoundaryShape::Tube { radius, height, axis } => (3, [radius, height, 0.0, 0.0], [axis.x, axis.y, axis.z]),
        BoundaryShape::Dodecahedron { radius } => (4, [radius, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    }
}

fn mat3_gpu_to_rows(m: &Mat3Gpu) -> [[f32; 3]; 3] {
    [
        [m.cols[0][0], m.cols[0][1], m.cols[0][2]],
        [m.cols[1][0], m.cols[1][1], m.cols[1][2]],
        [m.cols[2][0], m.cols[2][1], m.cols[2][2]],
    ]
}

fn rows_to_mat3_gpu(rows: &[[f32; 3]; 3]) -> Mat3Gpu {
    Mat3Gpu {
        cols: [
            [rows[0][0], rows[0][1], rows[0][2], 0.0],
            [rows[1][0], rows[1][1], rows[1][2], 0.0],
            [rows[2][0], rows[2][1], rows[2][2], 0.0],
        ],
    }
}

fn build_uniforms_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
    use crate::wgpu_utils::binding_builder::BindGroupLayoutBuilder;
    use crate::wgpu_utils::binding_glsl;
    BindGroupLayoutBuilder::new()
        .next_binding_compute(binding_glsl::uniform())
        .next_binding_compute(binding_glsl::uniform())
        .next_binding_compute(binding_glsl::uniform())
        .create(device, "BindGroupLayout: Uniforms")
}

/// Filesystem-backed shader directory relative to the crate root, used by the
/// default constructor path (`demos/headless.rs`); library embedders may pass
/// any path via [`Simulator::new`].
pub fn default_shader_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/shaders")
}
