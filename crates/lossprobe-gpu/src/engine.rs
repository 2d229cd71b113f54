//! The BC metrics engine: async compute dispatch with latest-wins delivery.

use std::sync::atomic::{AtomicU64, Ordering};

use lossprobe_core::metrics::{
    BcEncodeResult, MetricsError, PipelineBcMetrics, RawChannelMetrics,
};

use crate::buffers::{GpuImageHandle, MetricsBuffers};
use crate::metrics_dispatch::MetricsDispatch;
use crate::readback::MetricsReadback;

/// Monotonically increasing request numbering for latest-wins delivery.
///
/// Each computation takes a ticket when it starts; at completion time a
/// result is only published if no newer ticket has been issued since.
/// Superseded results are dropped, never queued.
#[derive(Debug, Default)]
pub struct RequestSequence {
    issued: AtomicU64,
}

/// A single request's position in the sequence.
#[derive(Debug, Clone, Copy)]
pub struct RequestTicket {
    seq: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket, superseding all earlier ones.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket {
            seq: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Whether `ticket` is still the most recently issued request.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.seq
    }
}

/// Computes per-channel BC error metrics on the GPU.
///
/// The device and queue are owned by the application shell and handed in
/// per call; the only cross-call state besides immutable pipeline objects
/// is the staleness sequence.
pub struct BcMetricsEngine {
    dispatch: MetricsDispatch,
    sequence: RequestSequence,
}

impl BcMetricsEngine {
    /// Create the engine's compute pipeline on the given device.
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            dispatch: MetricsDispatch::new(device),
            sequence: RequestSequence::new(),
        }
    }

    /// Compute raw per-channel metrics for an original/decompressed pair.
    ///
    /// Suspends while the GPU reduction and readback complete. Returns
    /// `Ok(None)` when a newer request superseded this one before it
    /// finished; the stale result is dropped, not delivered.
    ///
    /// # Errors
    /// [`MetricsError::DimensionMismatch`] if the pair differs in padded
    /// dimensions, [`MetricsError::DeviceError`] if the device fails
    /// mid-computation. Neither is retried here.
    pub async fn compute_metrics(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        original: &GpuImageHandle,
        decompressed: &GpuImageHandle,
    ) -> Result<Option<RawChannelMetrics>, MetricsError> {
        if original.width != decompressed.width || original.height != decompressed.height {
            return Err(MetricsError::DimensionMismatch {
                original_width: original.width,
                original_height: original.height,
                decompressed_width: decompressed.width,
                decompressed_height: decompressed.height,
            });
        }

        let ticket = self.sequence.begin();
        tracing::debug!(
            width = original.width,
            height = original.height,
            "metrics dispatch"
        );

        let accumulators = MetricsBuffers::new(device, original.pixel_count());
        let readback = MetricsReadback::new(device, &accumulators);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lossprobe_metrics_encoder"),
        });
        self.dispatch.dispatch(
            device,
            queue,
            original,
            decompressed,
            &accumulators,
            &mut encoder,
        );
        readback.copy_to_staging(&mut encoder, &accumulators);
        queue.submit(std::iter::once(encoder.finish()));

        let partials = readback.read(device).await?;

        let mut sum_sq = [0.0_f64; 3];
        let mut max_abs = [0.0_f64; 3];
        for (sums, maxima) in partials.sums.iter().zip(&partials.maxima) {
            for ch in 0..3 {
                sum_sq[ch] += f64::from(sums[ch]);
                max_abs[ch] = max_abs[ch].max(f64::from(maxima[ch]));
            }
        }
        let raw =
            RawChannelMetrics::from_sums(sum_sq, max_abs, original.width, original.height);

        if self.sequence.is_current(ticket) {
            Ok(Some(raw))
        } else {
            tracing::debug!("metrics result superseded, dropping");
            Ok(None)
        }
    }

    /// Compute metrics and enrich them with compression-size metadata from
    /// the completed encode. Same latest-wins semantics as
    /// [`compute_metrics`](Self::compute_metrics).
    pub async fn compute_bc_metrics(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        original: &GpuImageHandle,
        decompressed: &GpuImageHandle,
        encode: &BcEncodeResult,
    ) -> Result<Option<PipelineBcMetrics>, MetricsError> {
        let raw = self
            .compute_metrics(device, queue, original, decompressed)
            .await?;
        Ok(raw.map(|raw| PipelineBcMetrics::from_raw(&raw, encode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let sequence = RequestSequence::new();
        let first = sequence.begin();
        let second = sequence.begin();
        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));
    }

    #[test]
    fn test_ticket_superseded_only_by_newer_requests() {
        let sequence = RequestSequence::new();
        let ticket = sequence.begin();
        assert!(sequence.is_current(ticket));
        assert!(sequence.is_current(ticket), "checking must not consume");
        sequence.begin();
        assert!(!sequence.is_current(ticket));
    }

    #[test]
    fn test_sequence_is_monotonic_across_many_requests() {
        let sequence = RequestSequence::new();
        let tickets: Vec<_> = (0..100).map(|_| sequence.begin()).collect();
        for stale in &tickets[..99] {
            assert!(!sequence.is_current(*stale));
        }
        assert!(sequence.is_current(tickets[99]));
    }
}
