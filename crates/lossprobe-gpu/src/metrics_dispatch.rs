//! GPU compute dispatch for the per-channel error reduction.

use crate::buffers::{GpuImageHandle, MetricsBuffers};
use crate::pipeline::{create_compute_pipeline, storage_ro_entry, storage_rw_entry, uniform_entry};

/// Pixels reduced per workgroup. Must match the shader's workgroup size.
pub const WORKGROUP_SIZE: u32 = 256;

/// Dispatches the metrics reduction shader and manages its pipeline state.
pub struct MetricsDispatch {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    // Cached uniform buffer (updated via queue.write_buffer per dispatch).
    pixel_count_buf: wgpu::Buffer,
}

impl MetricsDispatch {
    /// Create the metrics compute pipeline.
    pub fn new(device: &wgpu::Device) -> Self {
        let (pipeline, layout) = create_compute_pipeline(
            device,
            "metrics",
            include_str!("../shaders/metrics.wgsl"),
            "metrics",
            &[
                storage_ro_entry(0),
                storage_ro_entry(1),
                uniform_entry(2, 4),
                storage_rw_entry(3),
                storage_rw_entry(4),
            ],
        );

        let pixel_count_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lossprobe_metrics_pixel_count"),
            size: 16, // u32 padded to 16 bytes
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            layout,
            pixel_count_buf,
        }
    }

    /// Record the reduction pass onto the encoder.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        original: &GpuImageHandle,
        decompressed: &GpuImageHandle,
        accumulators: &MetricsBuffers,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let pixel_count = original.pixel_count();
        let pad = |v: u32| -> [u32; 4] { [v, 0, 0, 0] };
        queue.write_buffer(
            &self.pixel_count_buf,
            0,
            bytemuck::cast_slice(&pad(pixel_count)),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lossprobe_metrics_bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: original.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: decompressed.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.pixel_count_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: accumulators.partial_sq.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: accumulators.partial_max.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("lossprobe_metrics_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(accumulators.workgroups, 1, 1);
    }
}
