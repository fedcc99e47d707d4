//! Minimal headless driver for `mls_mpm_solver`: creates a
//! `wgpu::Device` against any available adapter, resets a cube of fluid
//! particles, advances the simulation for a fixed number of frames, and logs
//! per-frame metrics. Exists to exercise the public API end to end; real
//! embedders bring their own renderer and event loop.

use cgmath::Point3;
use mls_mpm_solver::{default_shader_dir, new_simulator, InitialDistribution, SimConfig};
use std::rc::Rc;
use std::time::Instant;

const FRAME_COUNT: u32 = 120;
const FRAME_DT: f32 = 1.0 / 60.0;

fn main() {
    env_logger::init();

    let (device, queue) = futures::executor::block_on(create_device());
    let device = Rc::new(device);
    let queue = Rc::new(queue);

    let config = SimConfig {
        particle_count: 8_000,
        grid_size: 32,
        ..SimConfig::default()
    };

    let mut simulator = new_simulator(device.clone(), queue.clone(), &default_shader_dir(), config).expect("failed to construct simulator");

    simulator
        .reset(
            8_000,
            InitialDistribution::Cube {
                min: Point3::new(8.0, 8.0, 8.0),
                max: Point3::new(24.0, 20.0, 24.0),
            },
            42,
        )
        .expect("failed to seed particles");

    let start = Instant::now();
    for frame in 0..FRAME_COUNT {
        let dt_used = simulator.step(FRAME_DT).expect("step failed");
        if frame % 30 == 0 {
            let metrics = simulator.metrics();
            log::info!(
                "frame {frame}: substeps={} dt_used={:.5} particles={}",
                metrics.substeps_last_frame,
                dt_used,
                simulator.particle_count()
            );
        }
    }
    log::info!("{FRAME_COUNT} frames in {:?}", start.elapsed());

    let snapshot = simulator.save_snapshot().expect("failed to snapshot");
    log::info!("serialized snapshot: {} bytes", snapshot.len());
}

async fn create_device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .expect("no suitable GPU adapter found");

    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mls-mpm-solver headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .expect("failed to create device")
}
