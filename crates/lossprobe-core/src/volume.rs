//! Color-volume propagation model.
//!
//! Estimates, from stage metadata alone, how gamut coverage and dynamic
//! range shrink as the signal passes through each enabled pipeline stage.
//! Both measures are normalized: 1.0 = full AP1 gamut / full scene-linear
//! range. This is an estimator for UI gauges, not a colorimetric transform,
//! so unknown inputs degrade to a neutral default instead of failing.

use crate::settings::{InputColorSpace, PipelineSettings};
use crate::stage::STAGE_COUNT;

/// Normalized color volume at a point in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageVolume {
    /// Chromaticity coverage relative to AP1, in `[0, 1]`.
    pub gamut: f32,
    /// Luminance range relative to scene-linear, in `[0, 1]`.
    pub range: f32,
}

/// How one stage transforms the running volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageFactor {
    /// Proportional loss: running volume is multiplied by the factors.
    Multiply { gamut: f32, range: f32 },
    /// Hard limit: running volume is clamped to `min(current, ceiling)`.
    /// Models an absolute display bound, e.g. the final sRGB clamp.
    Ceiling { gamut: f32, range: f32 },
}

impl StageFactor {
    fn apply(&self, volume: StageVolume) -> StageVolume {
        match *self {
            Self::Multiply { gamut, range } => StageVolume {
                gamut: volume.gamut * gamut,
                range: volume.range * range,
            },
            Self::Ceiling { gamut, range } => StageVolume {
                gamut: volume.gamut.min(gamut),
                range: volume.range.min(range),
            },
        }
    }
}

/// Per-stage volume transforms, indexed by stage ordinal.
/// All factors and ceilings are <= 1.0, so the fold can only shrink.
const STAGE_FACTORS: [StageFactor; STAGE_COUNT] = [
    // Load: decode to scene-linear, lossless by definition.
    StageFactor::Multiply { gamut: 1.0, range: 1.0 },
    // BC compress: endpoint quantization nibbles at saturated colors.
    StageFactor::Multiply { gamut: 0.985, range: 0.97 },
    // BC decompress: reconstruction, no further loss.
    StageFactor::Multiply { gamut: 1.0, range: 1.0 },
    // Grade: creative adjustments push some values out of the working volume.
    StageFactor::Multiply { gamut: 0.96, range: 0.92 },
    // RRT: highlight desaturation and the filmic shoulder.
    StageFactor::Multiply { gamut: 0.90, range: 0.78 },
    // ODT: tone-map to the display class, the big range hit.
    StageFactor::Multiply { gamut: 0.86, range: 0.62 },
    // Output encode: transfer-function quantization.
    StageFactor::Multiply { gamut: 0.97, range: 0.90 },
    // Display remap: panel calibration headroom.
    StageFactor::Multiply { gamut: 0.93, range: 0.88 },
    // Final display: hard clamp to the panel's sRGB volume.
    StageFactor::Ceiling { gamut: 0.48, range: 0.40 },
];

/// Base gamut per input color space, indexed by
/// [`InputColorSpace::table_index`]. AP0 clamps to the AP1 working gamut.
const BASE_GAMUT: [f32; 6] = [1.0, 1.0, 0.92, 0.78, 0.64, 0.64];

/// Base dynamic range per input color space, same indexing.
const BASE_RANGE: [f32; 6] = [1.0, 1.0, 0.95, 0.90, 0.85, 0.55];

/// Neutral fallback for color spaces outside the base tables.
const NEUTRAL_BASE: (f32, f32) = (0.5, 0.5);

fn base_volume(space: InputColorSpace) -> StageVolume {
    let (gamut, range) = match space.table_index() {
        Some(i) => (BASE_GAMUT[i], BASE_RANGE[i]),
        None => {
            tracing::debug!(space = space.label(), "color space not in base tables, using neutral");
            NEUTRAL_BASE
        }
    };
    StageVolume { gamut, range }
}

/// Compute the color volume remaining after `stage_index`.
///
/// Folds the factor table over stages `0..=stage_index`. Stage 0 (the load)
/// always applies; a later stage reported disabled by `is_enabled` is
/// treated as identity. Stage indices past the factor table are transparent
/// pass-through. Never fails: unknown color spaces use the neutral default.
pub fn stage_volume(
    stage_index: usize,
    settings: &PipelineSettings,
    is_enabled: impl Fn(usize) -> bool,
) -> StageVolume {
    let mut volume = base_volume(settings.input_space);

    for index in 0..=stage_index {
        let Some(factor) = STAGE_FACTORS.get(index) else {
            // Beyond the table: transparent pass-through.
            break;
        };
        if index > 0 && !is_enabled(index) {
            continue;
        }
        let next = factor.apply(volume);
        // The pipeline never recovers volume it has lost.
        debug_assert!(next.gamut <= volume.gamut && next.range <= volume.range);
        volume = next;
    }

    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PipelineSettings;
    use approx::assert_relative_eq;

    fn all_enabled(_: usize) -> bool {
        true
    }

    #[test]
    fn test_volume_is_monotonically_non_increasing() {
        let settings = PipelineSettings::default();
        let mut previous = stage_volume(0, &settings, all_enabled);
        for index in 1..STAGE_COUNT {
            let current = stage_volume(index, &settings, all_enabled);
            assert!(
                current.gamut <= previous.gamut && current.range <= previous.range,
                "stage {index} increased volume: {current:?} > {previous:?}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_final_stage_takes_min_not_multiply() {
        // sRGB input starts below the display ceiling on range; the clamp
        // must leave it alone rather than shrinking it further.
        let settings = PipelineSettings {
            input_space: InputColorSpace::Srgb,
            ..PipelineSettings::default()
        };
        // Disable everything between load and display so the sRGB base
        // arrives at the clamp untouched. Both axes sit above the ceiling,
        // so the clamp must bring them down to exactly the ceiling.
        let only_display = |index: usize| index == STAGE_COUNT - 1;
        let volume = stage_volume(STAGE_COUNT - 1, &settings, only_display);
        assert_relative_eq!(volume.gamut, 0.48);
        assert_relative_eq!(volume.range, 0.40);

        // Upstream volume already below the ceiling passes through intact:
        // with every stage enabled, the full sRGB chain lands under the
        // ceiling before the clamp, and the clamp must not shrink it more.
        let before_clamp = stage_volume(STAGE_COUNT - 2, &settings, all_enabled);
        assert!(before_clamp.gamut < 0.48 && before_clamp.range < 0.40);
        let after_clamp = stage_volume(STAGE_COUNT - 1, &settings, all_enabled);
        assert_eq!(after_clamp, before_clamp);
    }

    #[test]
    fn test_ceiling_never_exceeded_regardless_of_upstream() {
        for space in InputColorSpace::all() {
            let settings = PipelineSettings {
                input_space: *space,
                ..PipelineSettings::default()
            };
            let volume = stage_volume(STAGE_COUNT - 1, &settings, all_enabled);
            assert!(volume.gamut <= 0.48, "{}", space.label());
            assert!(volume.range <= 0.40, "{}", space.label());
        }
    }

    #[test]
    fn test_disabled_stage_is_transparent() {
        let settings = PipelineSettings::default();
        // Grade (3) disabled: identical to folding with grade's factors
        // removed, and strictly >= the all-enabled result.
        let without_grade = stage_volume(5, &settings, |i| i != 3);
        let with_grade = stage_volume(5, &settings, all_enabled);
        assert_relative_eq!(without_grade.gamut, with_grade.gamut / 0.96, epsilon = 1e-6);
        assert_relative_eq!(without_grade.range, with_grade.range / 0.92, epsilon = 1e-6);
    }

    #[test]
    fn test_load_stage_ignores_enabled_predicate() {
        let settings = PipelineSettings::default();
        let none_enabled = stage_volume(0, &settings, |_| false);
        let all = stage_volume(0, &settings, all_enabled);
        assert_eq!(none_enabled, all);
    }

    #[test]
    fn test_unknown_color_space_degrades_to_neutral() {
        let settings = PipelineSettings {
            input_space: InputColorSpace::Custom(999),
            ..PipelineSettings::default()
        };
        let volume = stage_volume(0, &settings, all_enabled);
        assert_eq!(volume, StageVolume { gamut: 0.5, range: 0.5 });
    }

    #[test]
    fn test_index_past_table_is_pass_through() {
        let settings = PipelineSettings::default();
        let last = stage_volume(STAGE_COUNT - 1, &settings, all_enabled);
        let past = stage_volume(STAGE_COUNT + 5, &settings, all_enabled);
        assert_eq!(last, past);
    }

    #[test]
    fn test_volume_stays_in_unit_interval() {
        for space in InputColorSpace::all() {
            let settings = PipelineSettings {
                input_space: *space,
                ..PipelineSettings::default()
            };
            for index in 0..STAGE_COUNT {
                let v = stage_volume(index, &settings, all_enabled);
                assert!((0.0..=1.0).contains(&v.gamut));
                assert!((0.0..=1.0).contains(&v.range));
            }
        }
    }
}
