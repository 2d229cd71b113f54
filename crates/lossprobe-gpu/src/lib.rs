//! Lossprobe GPU — wgpu-based compute implementation of the BC metrics
//! engine and the delta-overlay dispatch.
//!
//! This crate owns no device: the application shell hands in the wgpu
//! device/queue. It exposes a plain wgpu API that the shell wraps into its
//! own resources.

pub mod buffers;
pub mod delta_dispatch;
pub mod engine;
pub mod metrics_dispatch;
mod pipeline;
pub mod readback;

pub use engine::BcMetricsEngine;
