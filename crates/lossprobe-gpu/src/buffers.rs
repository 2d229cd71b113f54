//! GPU buffer management for the analysis passes.

use lossprobe_core::image::FloatImage;
use wgpu::util::DeviceExt;

/// Handle to a GPU image stored as a storage buffer of `vec4<f32>`.
pub struct GpuImageHandle {
    pub buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
}

impl GpuImageHandle {
    /// Upload a [`FloatImage`] to the GPU as a storage buffer.
    pub fn upload(device: &wgpu::Device, image: &FloatImage) -> Self {
        let data: &[u8] = bytemuck::cast_slice(&image.pixels);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lossprobe_image_upload"),
            contents: data,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            width: image.width,
            height: image.height,
        }
    }

    /// Create an uninitialized GPU image buffer for output (delta overlay).
    pub fn create_output(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = (width as u64) * (height as u64) * 16; // 4 x f32
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lossprobe_image_output"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            width,
            height,
        }
    }

    /// Pixel count.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Buffer size in bytes.
    pub fn byte_size(&self) -> u64 {
        (self.width as u64) * (self.height as u64) * 16
    }
}

/// Per-request accumulator buffers for the metrics reduction.
///
/// One `vec4<f32>` slot per workgroup: squared-error partial sums in one
/// buffer, per-channel absolute-error maxima in the other. Every slot is
/// written by its workgroup, so no clear pass is needed.
pub struct MetricsBuffers {
    pub partial_sq: wgpu::Buffer,
    pub partial_max: wgpu::Buffer,
    /// Number of workgroups (and slots) the buffers are sized for.
    pub workgroups: u32,
}

impl MetricsBuffers {
    /// Allocate accumulators for an image of `pixel_count` pixels reduced
    /// in workgroups of [`crate::metrics_dispatch::WORKGROUP_SIZE`].
    pub fn new(device: &wgpu::Device, pixel_count: u32) -> Self {
        let workgroups = pixel_count.div_ceil(crate::metrics_dispatch::WORKGROUP_SIZE);
        let size = (workgroups as u64) * 16;
        let make = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        Self {
            partial_sq: make("lossprobe_metrics_partial_sq"),
            partial_max: make("lossprobe_metrics_partial_max"),
            workgroups,
        }
    }

    /// Byte size of each accumulator buffer.
    pub fn byte_size(&self) -> u64 {
        (self.workgroups as u64) * 16
    }
}
