//! Snapshot of all adjustable pipeline parameters.
//!
//! `PipelineSettings` is owned by the UI shell and passed into the core by
//! immutable snapshot per call. The core never mutates it and never holds
//! it across calls.

use serde::{Deserialize, Serialize};

/// Identifies the color space of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputColorSpace {
    /// ACES 2065-1 (AP0 primaries, linear).
    Aces2065_1,
    /// ACEScg (AP1 primaries, linear). Default working space.
    AcesCg,
    /// ITU-R BT.2020 (wide gamut, linear).
    Rec2020,
    /// DCI-P3 (digital cinema, linear).
    DciP3,
    /// Linear sRGB (Rec. 709 primaries).
    LinearSrgb,
    /// sRGB (Rec. 709 primaries, sRGB transfer).
    Srgb,
    /// User-defined color space by ID. Not in the volume base tables.
    Custom(u32),
}

impl InputColorSpace {
    /// Human-readable label for UI menus and status text.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Aces2065_1 => "ACES2065-1",
            Self::AcesCg => "ACEScg",
            Self::Rec2020 => "Rec.2020",
            Self::DciP3 => "DCI-P3",
            Self::LinearSrgb => "Linear sRGB",
            Self::Srgb => "sRGB",
            Self::Custom(_) => "Custom",
        }
    }

    /// Position in the volume base tables, or `None` for spaces outside
    /// them (those degrade to the neutral default, see [`crate::volume`]).
    pub const fn table_index(&self) -> Option<usize> {
        match self {
            Self::Aces2065_1 => Some(0),
            Self::AcesCg => Some(1),
            Self::Rec2020 => Some(2),
            Self::DciP3 => Some(3),
            Self::LinearSrgb => Some(4),
            Self::Srgb => Some(5),
            Self::Custom(_) => None,
        }
    }

    /// Built-in color spaces, in menu order.
    pub fn all() -> &'static [Self] {
        const ALL: [InputColorSpace; 6] = [
            InputColorSpace::Aces2065_1,
            InputColorSpace::AcesCg,
            InputColorSpace::Rec2020,
            InputColorSpace::DciP3,
            InputColorSpace::LinearSrgb,
            InputColorSpace::Srgb,
        ];
        &ALL
    }
}

/// GPU block-compression format for the BC round-trip stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BcFormat {
    /// BC1: 4 bpp, RGB, no meaningful alpha.
    Bc1,
    /// BC3: 8 bpp, RGBA.
    Bc3,
    /// BC6H: 8 bpp, signed/unsigned half-float RGB. The HDR format.
    Bc6h,
    /// BC7: 8 bpp, high-quality RGBA.
    Bc7,
}

impl BcFormat {
    /// Encoded bytes per 4x4 block.
    pub const fn bytes_per_block(&self) -> usize {
        match self {
            Self::Bc1 => 8,
            Self::Bc3 | Self::Bc6h | Self::Bc7 => 16,
        }
    }

    /// Label for the metrics panel.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bc1 => "BC1",
            Self::Bc3 => "BC3",
            Self::Bc6h => "BC6H",
            Self::Bc7 => "BC7",
        }
    }
}

/// Tone-mapping operator applied by the ODT stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TonemapOperator {
    /// ACES filmic curve (the default RRT+ODT pairing).
    AcesFilm,
    /// Simple Reinhard.
    Reinhard,
    /// Hable / Uncharted 2 filmic.
    Hable,
}

/// Transfer function the output-encoding stage applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTransfer {
    /// No encoding — linear light all the way to the surface.
    Linear,
    /// sRGB / Display P3 SDR (most common).
    Srgb,
    /// PQ (SMPTE ST.2084) for HDR displays.
    Pq,
    /// Hybrid Log-Gamma for broadcast HDR.
    Hlg,
}

impl OutputTransfer {
    /// Whether values downstream of the encode stage are still linear HDR.
    /// Drives the compressive-map branch of the delta visualizer.
    pub const fn is_linear(&self) -> bool {
        matches!(self, Self::Linear)
    }
}

/// Flat record of every adjustable pipeline parameter.
///
/// This is the immutable contract between the UI shell and the core: the
/// shell owns and mutates it, the core reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Color space of the source image.
    pub input_space: InputColorSpace,
    /// BC format for the compression round-trip.
    pub bc_format: BcFormat,

    // Grade
    /// Exposure adjustment in stops. 0.0 = neutral.
    pub exposure: f32,
    /// Contrast multiplier. 1.0 = neutral.
    pub contrast: f32,
    /// Saturation multiplier. 1.0 = neutral.
    pub saturation: f32,

    // Tone-mapping
    /// Operator used by the ODT stage.
    pub tonemap: TonemapOperator,
    /// Target peak luminance in nits.
    pub peak_nits: f32,

    // Output
    /// Transfer function applied by the output-encoding stage.
    pub output_transfer: OutputTransfer,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_space: InputColorSpace::AcesCg,
            bc_format: BcFormat::Bc6h,
            exposure: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            tonemap: TonemapOperator::AcesFilm,
            peak_nits: 1000.0,
            output_transfer: OutputTransfer::Srgb,
        }
    }
}
