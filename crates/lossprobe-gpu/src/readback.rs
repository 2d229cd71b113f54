//! GPU-to-CPU readback for metric accumulators and overlay images.

use std::task::Poll;

use futures_channel::oneshot;
use futures_util::FutureExt;
use lossprobe_core::image::FloatImage;
use lossprobe_core::metrics::MetricsError;

use crate::buffers::{GpuImageHandle, MetricsBuffers};

/// Per-channel partial results read back from the reduction pass.
pub struct MetricsPartials {
    /// One squared-error sum per workgroup, `[r, g, b, unused]`.
    pub sums: Vec<[f32; 4]>,
    /// One absolute-error maximum per workgroup, `[r, g, b, unused]`.
    pub maxima: Vec<[f32; 4]>,
}

/// Staging buffers for one metrics readback.
pub struct MetricsReadback {
    sq_staging: wgpu::Buffer,
    max_staging: wgpu::Buffer,
}

/// Begin an async map of an entire buffer, completing through a oneshot.
fn map_buffer_async(
    buffer: &wgpu::Buffer,
) -> oneshot::Receiver<Result<(), wgpu::BufferAsyncError>> {
    let (tx, rx) = oneshot::channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    rx
}

/// Await a map completion, driving the device's event loop without
/// blocking between checks so the caller suspends cooperatively.
async fn await_map(
    device: &wgpu::Device,
    mut rx: oneshot::Receiver<Result<(), wgpu::BufferAsyncError>>,
) -> Result<(), MetricsError> {
    futures_util::future::poll_fn(move |cx| {
        if let Err(e) = device.poll(wgpu::PollType::Poll) {
            return Poll::Ready(Err(MetricsError::DeviceError(e.to_string())));
        }
        match rx.poll_unpin(cx) {
            Poll::Ready(Ok(Ok(()))) => Poll::Ready(Ok(())),
            Poll::Ready(Ok(Err(e))) => {
                Poll::Ready(Err(MetricsError::DeviceError(e.to_string())))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(MetricsError::DeviceError(
                "device dropped the map callback".into(),
            ))),
            Poll::Pending => {
                // The map callback fires from a later device poll; wake
                // immediately so the executor keeps driving us.
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    })
    .await
}

impl MetricsReadback {
    /// Create staging buffers sized to the accumulator buffers.
    pub fn new(device: &wgpu::Device, accumulators: &MetricsBuffers) -> Self {
        let make = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: accumulators.byte_size(),
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        };
        Self {
            sq_staging: make("lossprobe_metrics_sq_staging"),
            max_staging: make("lossprobe_metrics_max_staging"),
        }
    }

    /// Record copy commands from the accumulators to staging.
    pub fn copy_to_staging(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        accumulators: &MetricsBuffers,
    ) {
        encoder.copy_buffer_to_buffer(
            &accumulators.partial_sq,
            0,
            &self.sq_staging,
            0,
            self.sq_staging.size(),
        );
        encoder.copy_buffer_to_buffer(
            &accumulators.partial_max,
            0,
            &self.max_staging,
            0,
            self.max_staging.size(),
        );
    }

    /// Map both staging buffers, suspend until the device completes the
    /// maps, and read the partials. Must be called after `queue.submit()`.
    pub async fn read(&self, device: &wgpu::Device) -> Result<MetricsPartials, MetricsError> {
        let sq_rx = map_buffer_async(&self.sq_staging);
        let max_rx = map_buffer_async(&self.max_staging);

        await_map(device, sq_rx).await?;
        await_map(device, max_rx).await?;

        let sums = {
            let data = self.sq_staging.slice(..).get_mapped_range();
            let partials: &[[f32; 4]] = bytemuck::cast_slice(&data);
            let out = partials.to_vec();
            drop(data);
            self.sq_staging.unmap();
            out
        };

        let maxima = {
            let data = self.max_staging.slice(..).get_mapped_range();
            let partials: &[[f32; 4]] = bytemuck::cast_slice(&data);
            let out = partials.to_vec();
            drop(data);
            self.max_staging.unmap();
            out
        };

        Ok(MetricsPartials { sums, maxima })
    }
}

/// Download a GPU image buffer back to a [`FloatImage`].
/// Suspends until the copy and map complete.
pub async fn download_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    handle: &GpuImageHandle,
) -> Result<FloatImage, MetricsError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lossprobe_image_staging"),
        size: handle.byte_size(),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lossprobe_image_download_encoder"),
    });
    encoder.copy_buffer_to_buffer(&handle.buffer, 0, &staging, 0, handle.byte_size());
    queue.submit(std::iter::once(encoder.finish()));

    let rx = map_buffer_async(&staging);
    await_map(device, rx).await?;

    let data = staging.slice(..).get_mapped_range();
    let pixels: Vec<[f32; 4]> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    Ok(FloatImage {
        width: handle.width,
        height: handle.height,
        pixels,
    })
}
