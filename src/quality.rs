//! Non-fatal data-quality warnings.
//!
//! Warnings accumulate through the pipeline and are returned inside the
//! payload so the caller gets a best-effort result with explicit caveats.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::skeleton::JointId;

/// Why a run of missing frames was not interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GapReason {
    /// The gap is longer than the interpolation bound.
    TooLong,
    /// The gap touches the start or end of the clip.
    Unbracketed,
}

/// A caveat attached to the payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum DataQualityWarning {
    /// A joint stayed missing over `[start_frame, end_frame]`.
    GapNotInterpolated {
        joint: JointId,
        start_frame: usize,
        end_frame: usize,
        reason: GapReason,
    },
    /// A joint was never detected above the confidence floor.
    JointUndetected { joint: JointId },
    /// Frames lacking an anchor were dropped from the normalized stream.
    MissingAnchor { frames: usize, total_frames: usize },
    /// A metric was not computed for one segment.
    MetricOmitted {
        metric: String,
        segment_index: usize,
        missing_fraction: f64,
    },
    /// The trailing segment never returned to rest.
    IncompleteSegment {
        segment_index: usize,
        start_frame: usize,
        end_frame: usize,
    },
    /// The reference profile expects a metric that was never produced.
    ReferenceMetricMissing { metric: String },
}

impl DataQualityWarning {
    /// Metric name the warning concerns, if any.
    #[must_use]
    pub fn metric(&self) -> Option<&str> {
        match self {
            Self::MetricOmitted { metric, .. } | Self::ReferenceMetricMissing { metric } => {
                Some(metric)
            }
            _ => None,
        }
    }

    /// Joint the warning concerns, if any.
    #[must_use]
    pub const fn joint(&self) -> Option<JointId> {
        match self {
            Self::GapNotInterpolated { joint, .. } | Self::JointUndetected { joint } => {
                Some(*joint)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GapNotInterpolated {
                joint,
                start_frame,
                end_frame,
                reason,
            } => write!(
                f,
                "{joint} missing over frames {start_frame}..={end_frame} ({reason:?})"
            ),
            Self::JointUndetected { joint } => write!(f, "{joint} never detected"),
            Self::MissingAnchor {
                frames,
                total_frames,
            } => write!(f, "{frames} of {total_frames} frames have no anchor"),
            Self::MetricOmitted {
                metric,
                segment_index,
                missing_fraction,
            } => write!(
                f,
                "{metric} omitted for segment {segment_index} ({:.0}% frames missing)",
                missing_fraction * 100.0
            ),
            Self::IncompleteSegment {
                segment_index,
                start_frame,
                end_frame,
            } => write!(
                f,
                "segment {segment_index} ({start_frame}..={end_frame}) never returned to rest"
            ),
            Self::ReferenceMetricMissing { metric } => {
                write!(f, "reference metric {metric} was not computed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let w = DataQualityWarning::MetricOmitted {
            metric: "knee_symmetry".into(),
            segment_index: 0,
            missing_fraction: 1.0,
        };
        assert_eq!(w.metric(), Some("knee_symmetry"));
        assert_eq!(w.joint(), None);

        let w = DataQualityWarning::JointUndetected {
            joint: JointId::LeftAnkle,
        };
        assert_eq!(w.joint(), Some(JointId::LeftAnkle));
        assert_eq!(w.to_string(), "left_ankle never detected");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_tagged_serialization() {
        let w = DataQualityWarning::IncompleteSegment {
            segment_index: 2,
            start_frame: 40,
            end_frame: 59,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "incomplete_segment");
        assert_eq!(json["segment_index"], 2);
    }
}
