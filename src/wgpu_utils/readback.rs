//! Blocking GPU->host buffer readback, used by
//! [`crate::driver::Simulator`]'s snapshot support and periodic `v_max`
//! sampling: copy into a `MAP_READ` staging buffer, map, poll-wait, copy out.

use futures::channel::oneshot;

/// Copies `count` elements of `T` out of `source` (which must have been
/// created with `BufferUsages::COPY_SRC`) and blocks the current thread until
/// the transfer and device-side map complete.
pub fn read_buffer_blocking<T: bytemuck::Pod>(device: &wgpu::Device, queue: &wgpu::Queue, source: &wgpu::Buffer, count: usize) -> Vec<T> {
    let byte_size = (count * std::mem::size_of::<T>()) as u64;
    if byte_size == 0 {
        return Vec::new();
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Buffer: readback staging"),
        size: byte_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Encoder: readback copy"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, byte_size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    futures::executor::block_on(receiver)
        .expect("readback map_async callback dropped without firing")
        .expect("readback buffer map failed");

    let data = slice.get_mapped_range();
    let result = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();
    result
}
