//! BC compression quality metrics: types, CPU reference computation, and
//! enrichment with size/ratio metadata.
//!
//! The GPU engine in `lossprobe-gpu` accumulates the same sums with a
//! compute shader and finalizes through [`RawChannelMetrics::from_sums`],
//! so CPU and GPU paths share one set of formulas.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::FloatImage;
use crate::settings::BcFormat;

/// Bytes per pixel of the uncompressed RGBA f32 reference format.
pub const REFERENCE_BYTES_PER_PIXEL: u64 = 16;

/// Errors from metrics computation.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(
        "texture dimensions differ: original {original_width}x{original_height}, \
         decompressed {decompressed_width}x{decompressed_height}"
    )]
    DimensionMismatch {
        original_width: u32,
        original_height: u32,
        decompressed_width: u32,
        decompressed_height: u32,
    },
    #[error("compute device failed: {0}")]
    DeviceError(String),
}

/// One statistic broken out per color channel plus a combined value.
///
/// Combined policy (pinned by tests): combined MSE is the mean of the three
/// channel MSEs, combined PSNR is derived from combined MSE, and combined
/// max-error is the maximum over channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStat {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub combined: f64,
}

/// Raw per-channel error metrics between an original image and its BC
/// round-trip, computed over the padded compressed-surface resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawChannelMetrics {
    /// Mean squared error per channel.
    pub mse: ChannelStat,
    /// Peak signal-to-noise ratio in dB, peak signal 1.0. Infinite when the
    /// corresponding MSE is zero.
    pub psnr: ChannelStat,
    /// Maximum absolute error per channel.
    pub max_error: ChannelStat,
    /// Padded width the metrics were computed over.
    pub width: u32,
    /// Padded height the metrics were computed over.
    pub height: u32,
}

/// PSNR in dB for a peak signal of 1.0.
fn psnr_from_mse(mse: f64) -> f64 {
    if mse <= 0.0 {
        f64::INFINITY
    } else {
        -10.0 * mse.log10()
    }
}

impl RawChannelMetrics {
    /// Finalize metrics from accumulated per-channel squared-error sums and
    /// absolute-error maxima over `width * height` pixels.
    pub fn from_sums(sum_sq: [f64; 3], max_abs: [f64; 3], width: u32, height: u32) -> Self {
        let n = f64::from(width) * f64::from(height);
        let mse_rgb = sum_sq.map(|s| s / n);
        let mse_combined = (mse_rgb[0] + mse_rgb[1] + mse_rgb[2]) / 3.0;

        Self {
            mse: ChannelStat {
                r: mse_rgb[0],
                g: mse_rgb[1],
                b: mse_rgb[2],
                combined: mse_combined,
            },
            psnr: ChannelStat {
                r: psnr_from_mse(mse_rgb[0]),
                g: psnr_from_mse(mse_rgb[1]),
                b: psnr_from_mse(mse_rgb[2]),
                combined: psnr_from_mse(mse_combined),
            },
            max_error: ChannelStat {
                r: max_abs[0],
                g: max_abs[1],
                b: max_abs[2],
                combined: max_abs[0].max(max_abs[1]).max(max_abs[2]),
            },
            width,
            height,
        }
    }
}

/// CPU reference computation of the per-channel metrics.
///
/// Both images must share the same (padded) dimensions. Alpha is ignored:
/// BC error analysis is an RGB concern.
pub fn compute_reference(
    original: &FloatImage,
    decompressed: &FloatImage,
) -> Result<RawChannelMetrics, MetricsError> {
    if original.width != decompressed.width || original.height != decompressed.height {
        return Err(MetricsError::DimensionMismatch {
            original_width: original.width,
            original_height: original.height,
            decompressed_width: decompressed.width,
            decompressed_height: decompressed.height,
        });
    }

    let mut sum_sq = [0.0_f64; 3];
    let mut max_abs = [0.0_f64; 3];
    for (a, b) in original.pixels.iter().zip(&decompressed.pixels) {
        for ch in 0..3 {
            let diff = f64::from(a[ch]) - f64::from(b[ch]);
            sum_sq[ch] += diff * diff;
            max_abs[ch] = max_abs[ch].max(diff.abs());
        }
    }

    Ok(RawChannelMetrics::from_sums(
        sum_sq,
        max_abs,
        original.width,
        original.height,
    ))
}

/// A completed BC encode, produced by the external encoder. The core only
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BcEncodeResult {
    /// Encoded block data.
    pub data: Vec<u8>,
    /// BC format the data is encoded in.
    pub format: BcFormat,
    /// Source dimensions before block alignment.
    pub original_width: u32,
    pub original_height: u32,
    /// Block-aligned dimensions of the compressed surface.
    pub padded_width: u32,
    pub padded_height: u32,
    /// Wall-clock encode time reported by the encoder.
    pub compression_time_ms: f32,
}

/// Quality metrics for one BC round-trip, enriched with size metadata for
/// the metrics panel. Immutable once produced; a newer computation
/// supersedes (never merges with) this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineBcMetrics {
    pub psnr: ChannelStat,
    pub mse: ChannelStat,
    pub max_error: ChannelStat,
    /// Uncompressed RGBA f32 bytes at the *unpadded* resolution divided by
    /// the encoded byte length.
    pub compression_ratio: f64,
    /// Encoded byte length.
    pub encoded_size_bytes: usize,
    /// Pass-through from the encode step, not recomputed.
    pub encode_time_ms: f32,
    /// Pass-through from the encode step.
    pub format: BcFormat,
    /// Unpadded source dimensions.
    pub width: u32,
    pub height: u32,
}

impl PipelineBcMetrics {
    /// Enrich raw channel metrics with compression-size metadata.
    pub fn from_raw(raw: &RawChannelMetrics, encode: &BcEncodeResult) -> Self {
        let uncompressed = u64::from(encode.original_width)
            * u64::from(encode.original_height)
            * REFERENCE_BYTES_PER_PIXEL;
        let compression_ratio = uncompressed as f64 / encode.data.len() as f64;

        Self {
            psnr: raw.psnr,
            mse: raw.mse,
            max_error: raw.max_error,
            compression_ratio,
            encoded_size_bytes: encode.data.len(),
            encode_time_ms: encode.compression_time_ms,
            format: encode.format,
            width: encode.original_width,
            height: encode.original_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn encode_result(w: u32, h: u32, encoded_len: usize) -> BcEncodeResult {
        BcEncodeResult {
            data: vec![0u8; encoded_len],
            format: BcFormat::Bc1,
            original_width: w,
            original_height: h,
            padded_width: w.next_multiple_of(4),
            padded_height: h.next_multiple_of(4),
            compression_time_ms: 12.5,
        }
    }

    #[test]
    fn test_compression_ratio_literal() {
        // 1024x1024 RGBA f32 source into a 1 MiB encoded payload.
        let raw = RawChannelMetrics::from_sums([0.0; 3], [0.0; 3], 1024, 1024);
        let metrics = PipelineBcMetrics::from_raw(&raw, &encode_result(1024, 1024, 1_048_576));
        assert_relative_eq!(metrics.compression_ratio, 16.0);
    }

    #[test]
    fn test_ratio_uses_unpadded_dimensions() {
        // 1022x1022 source padded to 1024x1024: the ratio numerator must use
        // the unpadded pixel count.
        let raw = RawChannelMetrics::from_sums([0.0; 3], [0.0; 3], 1024, 1024);
        let metrics = PipelineBcMetrics::from_raw(&raw, &encode_result(1022, 1022, 1_048_576));
        assert_relative_eq!(metrics.compression_ratio, (1022.0 * 1022.0 * 16.0) / 1_048_576.0);
    }

    #[test]
    fn test_identical_images_give_zero_mse_and_infinite_psnr() {
        let image = FloatImage::from_fn(8, 8, |x, y| [x as f32, y as f32, 0.5, 1.0]);
        let raw = compute_reference(&image, &image).expect("same dimensions");
        assert_eq!(raw.mse.combined, 0.0);
        assert!(raw.psnr.r.is_infinite() && raw.psnr.combined.is_infinite());
        assert_eq!(raw.max_error.combined, 0.0);
    }

    #[test]
    fn test_known_error_pattern() {
        // Red channel off by 0.1 everywhere, green by 0.2 in one pixel.
        let original = FloatImage::filled(4, 4, [0.5, 0.5, 0.5, 1.0]);
        let mut decompressed = original.clone();
        for px in &mut decompressed.pixels {
            px[0] = 0.6;
        }
        decompressed.pixels[5][1] = 0.7;

        let raw = compute_reference(&original, &decompressed).expect("same dimensions");
        assert_relative_eq!(raw.mse.r, 0.01, epsilon = 1e-8);
        assert_relative_eq!(raw.mse.g, 0.04 / 16.0, epsilon = 1e-8);
        assert_relative_eq!(raw.mse.b, 0.0);
        assert_relative_eq!(raw.max_error.r, 0.1, epsilon = 1e-7);
        assert_relative_eq!(raw.max_error.g, 0.2, epsilon = 1e-7);
        // Combined policy: mean of channel MSEs, max of channel maxima.
        assert_relative_eq!(
            raw.mse.combined,
            (0.01 + 0.04 / 16.0) / 3.0,
            epsilon = 1e-8
        );
        assert_relative_eq!(raw.max_error.combined, 0.2, epsilon = 1e-7);
        // PSNR literal for the red channel: -10 * log10(0.01) = 20 dB.
        assert_relative_eq!(raw.psnr.r, 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let a = FloatImage::filled(4, 4, [0.0; 4]);
        let b = FloatImage::filled(8, 4, [0.0; 4]);
        let err = compute_reference(&a, &b).unwrap_err();
        assert!(matches!(err, MetricsError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_reference_is_deterministic() {
        let original = FloatImage::from_fn(16, 16, |x, y| {
            [x as f32 * 0.1, y as f32 * 0.05, (x + y) as f32 * 0.01, 1.0]
        });
        let decompressed = FloatImage::from_fn(16, 16, |x, y| {
            [x as f32 * 0.1 + 0.003, y as f32 * 0.05, (x + y) as f32 * 0.01 - 0.001, 1.0]
        });
        let first = compute_reference(&original, &decompressed).expect("same dimensions");
        let second = compute_reference(&original, &decompressed).expect("same dimensions");
        assert_eq!(first, second);
    }
}
