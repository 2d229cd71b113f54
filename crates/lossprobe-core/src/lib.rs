//! Lossprobe Core — domain layer for pipeline fidelity analysis.
//!
//! This crate contains the stage registry, the color-volume propagation
//! model, the delta-visualizer math, and the CPU side of the BC metrics
//! computation. No GPU or framework dependencies.

pub mod delta;
pub mod image;
pub mod metrics;
pub mod settings;
pub mod stage;
pub mod volume;

// Re-exports for convenience.
pub use image::FloatImage;
pub use metrics::{BcEncodeResult, MetricsError, PipelineBcMetrics, RawChannelMetrics};
pub use settings::{BcFormat, InputColorSpace, PipelineSettings};
pub use stage::{STAGE_COUNT, StageDescriptor, StageError};
pub use volume::{StageVolume, stage_volume};
