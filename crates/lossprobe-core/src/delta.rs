//! Per-pixel error-highlight transform for delta overlays.
//!
//! Pure math, independent of the rendering surface. The GPU overlay shader
//! in `lossprobe-gpu` mirrors this function exactly; this is the reference.

use glam::Vec3;

/// Clamp for float render targets. f16 max, the largest value an
/// Rgba16Float overlay surface can hold.
pub const DELTA_CLAMP_MAX: f32 = 65504.0;

/// Reinhard-style compressive map: `max(c, 0) / (1 + max(c, 0))`.
///
/// Folds unbounded HDR magnitudes into `[0, 1)` while staying near-identity
/// for small SDR-range values, so compression errors in the displayable
/// range are not swamped by large absolute errors in highlights.
#[inline]
pub fn compress_hdr(color: Vec3) -> Vec3 {
    let c = color.max(Vec3::ZERO);
    c / (Vec3::ONE + c)
}

/// Visualize the error between an original and a decompressed color.
///
/// For linear/HDR-encoded signals both inputs pass through [`compress_hdr`]
/// before differencing. Signals already carrying a perceptual transfer
/// function (sRGB, log, PQ, HLG) are differenced raw — they are already
/// perceptually scaled. `amplification` is caller-supplied and unbounded;
/// the result is clamped per channel to [`DELTA_CLAMP_MAX`].
pub fn visualize_delta(
    original: Vec3,
    decompressed: Vec3,
    amplification: f32,
    linear_encoding: bool,
) -> Vec3 {
    let (a, b) = if linear_encoding {
        (compress_hdr(original), compress_hdr(decompressed))
    } else {
        (original, decompressed)
    };
    ((a - b).abs() * amplification).min(Vec3::splat(DELTA_CLAMP_MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_path_applies_compressive_map() {
        // Reinhard maps 4 -> 0.8 and 0 -> 0, so the visualized delta is
        // (0.8, 0.8, 0.8) rather than the raw (4, 4, 4).
        let delta = visualize_delta(Vec3::splat(4.0), Vec3::ZERO, 1.0, true);
        for channel in delta.to_array() {
            assert_relative_eq!(channel, 0.8);
        }
    }

    #[test]
    fn test_perceptual_path_uses_raw_difference() {
        let delta = visualize_delta(Vec3::splat(4.0), Vec3::ZERO, 1.0, false);
        assert_eq!(delta, Vec3::splat(4.0));

        let amplified = visualize_delta(Vec3::splat(4.0), Vec3::ZERO, 2.5, false);
        assert_eq!(amplified, Vec3::splat(10.0));
    }

    #[test]
    fn test_identical_inputs_produce_zero() {
        let color = Vec3::new(0.25, 1.5, 100.0);
        assert_eq!(visualize_delta(color, color, 50.0, true), Vec3::ZERO);
        assert_eq!(visualize_delta(color, color, 50.0, false), Vec3::ZERO);
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero_before_compression() {
        // Negative scene-linear values (out-of-gamut excursions) must not
        // blow up the Reinhard denominator.
        let delta = visualize_delta(Vec3::splat(-2.0), Vec3::ZERO, 1.0, true);
        assert_eq!(delta, Vec3::ZERO);
    }

    #[test]
    fn test_result_is_clamped_for_float_targets() {
        let delta = visualize_delta(Vec3::splat(4.0), Vec3::ZERO, 1.0e9, false);
        assert_eq!(delta, Vec3::splat(DELTA_CLAMP_MAX));
    }

    #[test]
    fn test_compressive_map_is_near_identity_for_small_values() {
        let small = Vec3::splat(0.01);
        let mapped = compress_hdr(small);
        assert_relative_eq!(mapped.x, 0.01 / 1.01, epsilon = 1e-7);
        assert!((mapped.x - small.x).abs() < 1e-4);
    }
}
