//! The fixed registry of pipeline stages.
//!
//! Downstream tables (volume factors, UI stage cards) index by this
//! ordinal, so the count, order, and meaning of the stages are part of the
//! public contract.

use thiserror::Error;

/// Number of stages in the pipeline. Fixed.
pub const STAGE_COUNT: usize = 9;

/// Immutable metadata for one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    /// Ordinal position in the pipeline, 0-based.
    pub index: usize,
    /// Full display name.
    pub name: &'static str,
    /// Short name for compact UI (gauges, tab strips).
    pub short_name: &'static str,
    /// One-sentence description for tooltips.
    pub description: &'static str,
}

/// Errors from stage registry lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("stage index {index} out of range (pipeline has {STAGE_COUNT} stages)")]
    OutOfRange { index: usize },
}

const STAGES: [StageDescriptor; STAGE_COUNT] = [
    StageDescriptor {
        index: 0,
        name: "Scene-Linear Load",
        short_name: "Load",
        description: "Decode the source image into scene-linear floating point.",
    },
    StageDescriptor {
        index: 1,
        name: "BC Compression",
        short_name: "BC Enc",
        description: "Block-compress the linear image into the selected BC format.",
    },
    StageDescriptor {
        index: 2,
        name: "BC Decompression",
        short_name: "BC Dec",
        description: "Decode the BC blocks back to floating point for sampling.",
    },
    StageDescriptor {
        index: 3,
        name: "Creative Grade",
        short_name: "Grade",
        description: "Apply exposure, contrast, and saturation adjustments.",
    },
    StageDescriptor {
        index: 4,
        name: "Reference Rendering Transform",
        short_name: "RRT",
        description: "Map scene-referred values toward a display-referred rendering.",
    },
    StageDescriptor {
        index: 5,
        name: "Output Device Transform",
        short_name: "ODT",
        description: "Tone-map to the dynamic range of the target display class.",
    },
    StageDescriptor {
        index: 6,
        name: "Output Encoding",
        short_name: "Encode",
        description: "Apply the output transfer function (sRGB, PQ, or HLG).",
    },
    StageDescriptor {
        index: 7,
        name: "Display Remap",
        short_name: "Remap",
        description: "Remap encoded values to the attached display's capabilities.",
    },
    StageDescriptor {
        index: 8,
        name: "Final Display",
        short_name: "Display",
        description: "Present through the swapchain; hard-clamps to the panel gamut.",
    },
];

/// Look up the descriptor for a stage ordinal.
pub fn describe(index: usize) -> Result<&'static StageDescriptor, StageError> {
    STAGES.get(index).ok_or(StageError::OutOfRange { index })
}

/// All stages in pipeline order.
pub fn all() -> &'static [StageDescriptor] {
    &STAGES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_returns_matching_ordinal() {
        for index in 0..STAGE_COUNT {
            let stage = describe(index).expect("index within range");
            assert_eq!(stage.index, index);
        }
    }

    #[test]
    fn test_describe_rejects_out_of_range() {
        assert_eq!(
            describe(STAGE_COUNT),
            Err(StageError::OutOfRange { index: STAGE_COUNT })
        );
        assert!(describe(usize::MAX).is_err());
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let short_names: Vec<&str> = all().iter().map(|s| s.short_name).collect();
        assert_eq!(
            short_names,
            [
                "Load", "BC Enc", "BC Dec", "Grade", "RRT", "ODT", "Encode", "Remap", "Display"
            ]
        );
    }
}
