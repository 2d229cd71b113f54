//! GPU compute dispatch for the delta-overlay pass.
//!
//! The shader mirrors `lossprobe_core::delta::visualize_delta`; the core
//! function is the behavioral reference.

use crate::buffers::GpuImageHandle;
use crate::pipeline::{create_compute_pipeline, storage_ro_entry, storage_rw_entry, uniform_entry};

/// Uniform block for the delta shader. Layout matches `DeltaParams` in WGSL.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DeltaParams {
    pixel_count: u32,
    linear_encoding: u32,
    amplification: f32,
    _pad: u32,
}

/// Dispatches the delta-overlay shader.
pub struct DeltaDispatch {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params_buf: wgpu::Buffer,
}

impl DeltaDispatch {
    /// Create the delta compute pipeline.
    pub fn new(device: &wgpu::Device) -> Self {
        let (pipeline, layout) = create_compute_pipeline(
            device,
            "delta",
            include_str!("../shaders/delta.wgsl"),
            "delta",
            &[
                storage_ro_entry(0),
                storage_ro_entry(1),
                uniform_entry(2, 16),
                storage_rw_entry(3),
            ],
        );

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lossprobe_delta_params"),
            size: std::mem::size_of::<DeltaParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            layout,
            params_buf,
        }
    }

    /// Record the overlay pass: per-pixel visualized delta of
    /// `original` vs `decompressed` into `overlay`.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        original: &GpuImageHandle,
        decompressed: &GpuImageHandle,
        overlay: &GpuImageHandle,
        amplification: f32,
        linear_encoding: bool,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let pixel_count = original.pixel_count();
        let params = DeltaParams {
            pixel_count,
            linear_encoding: u32::from(linear_encoding),
            amplification,
            _pad: 0,
        };
        queue.write_buffer(&self.params_buf, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lossprobe_delta_bg"),
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
                    resource: self.params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: overlay.buffer.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("lossprobe_delta_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(pixel_count.div_ceil(256), 1, 1);
    }
}
