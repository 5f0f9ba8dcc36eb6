//! Payload invariant checks.
//!
//! [`check_payload_invariants`] audits a [`FeedbackPayload`] for the
//! properties every extraction must satisfy, reporting each breach instead
//! of stopping at the first.

use std::fmt;

use crate::feedback::FeedbackPayload;
use crate::metrics::{MetricScope, MetricUnit};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// An angle outside [0, 180] degrees.
    AngleOutOfRange { metric: String, value: f64 },
    /// A negative or non-finite ratio.
    NegativeRatio { metric: String, value: f64 },
    /// A value that is NaN or infinite.
    NonFinite { metric: String },
    /// Segments overlap, are out of order, or run backwards.
    SegmentOrder { index: usize },
    /// More segments used than exist.
    UsedExceedsTotal { metric: String, used: usize, total: usize },
    /// A segment neither contributed to nor was excluded from a metric.
    SegmentUnaccounted { metric: String, segment_index: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AngleOutOfRange { metric, value } => {
                write!(f, "{metric}: angle {value} outside [0, 180]")
            }
            Self::NegativeRatio { metric, value } => write!(f, "{metric}: ratio {value} < 0"),
            Self::NonFinite { metric } => write!(f, "{metric}: non-finite value"),
            Self::SegmentOrder { index } => write!(f, "segment {index} overlaps or is out of order"),
            Self::UsedExceedsTotal { metric, used, total } => {
                write!(f, "{metric}: {used} segments used of {total}")
            }
            Self::SegmentUnaccounted {
                metric,
                segment_index,
            } => write!(f, "{metric}: segment {segment_index} neither used nor excluded"),
        }
    }
}

/// Result of [`check_payload_invariants`].
#[derive(Debug, Clone, Default)]
pub struct PayloadCheck {
    pub violations: Vec<InvariantViolation>,
    /// Number of metric values inspected.
    pub values_checked: usize,
    /// Whether no invariant is broken.
    pub is_healthy: bool,
}

/// Audit `payload` against the extraction invariants:
///
/// - angles lie in [0, 180] degrees, ratios are non-negative, values finite
/// - segments are ordered, non-overlapping and indexed by position
/// - `segments_used <= segments_total`
/// - every segment of a per-segment metric is either used or excluded
#[must_use]
pub fn check_payload_invariants(payload: &FeedbackPayload) -> PayloadCheck {
    let mut violations = Vec::new();
    let mut values_checked = 0;

    for (i, segment) in payload.segments.iter().enumerate() {
        let ordered = i
            .checked_sub(1)
            .and_then(|prev| payload.segments.get(prev))
            .map_or(true, |prev| prev.end_frame < segment.start_frame);
        if segment.index != i || segment.start_frame > segment.end_frame || !ordered {
            violations.push(InvariantViolation::SegmentOrder { index: i });
        }
    }

    for feedback in &payload.per_metric {
        let summary = &feedback.summary;
        let name = &summary.name;

        let values = summary
            .per_segment
            .iter()
            .map(|v| v.value)
            .chain(summary.stats.iter().flat_map(|s| [s.mean, s.min, s.max]));
        for value in values {
            values_checked += 1;
            if !value.is_finite() {
                violations.push(InvariantViolation::NonFinite { metric: name.clone() });
                continue;
            }
            match summary.unit {
                MetricUnit::Degrees if !(0.0..=180.0).contains(&value) => {
                    violations.push(InvariantViolation::AngleOutOfRange {
                        metric: name.clone(),
                        value,
                    });
                }
                MetricUnit::Ratio if value < 0.0 => {
                    violations.push(InvariantViolation::NegativeRatio {
                        metric: name.clone(),
                        value,
                    });
                }
                _ => {}
            }
        }

        if summary.segments_used > summary.segments_total {
            violations.push(InvariantViolation::UsedExceedsTotal {
                metric: name.clone(),
                used: summary.segments_used,
                total: summary.segments_total,
            });
        }

        if summary.scope == MetricScope::PerSegment {
            let accounted = summary.segments_used + summary.excluded.len();
            if accounted != summary.segments_total {
                let first_missing = payload.segments.iter().map(|s| s.index).find(|&idx| {
                    summary.excluded.iter().all(|e| e.segment_index != idx)
                        && summary.segment_value(idx).is_none()
                });
                violations.push(InvariantViolation::SegmentUnaccounted {
                    metric: name.clone(),
                    segment_index: first_missing.unwrap_or(accounted),
                });
            }
        }
    }

    PayloadCheck {
        is_healthy: violations.is_empty(),
        violations,
        values_checked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{MetricSummary, SegmentValue, SummaryStats};
    use crate::feedback::{ClipAssessment, MetricFeedback};
    use crate::segmentation::{Segment, SegmentStatus};

    fn segment(index: usize, start: usize, end: usize) -> Segment {
        Segment {
            index,
            start_frame: start,
            end_frame: end,
            peak_frame: start,
            motion_type: "squat".into(),
            status: SegmentStatus::Complete,
        }
    }

    fn feedback(name: &str, unit: MetricUnit, values: &[f64]) -> MetricFeedback {
        let summary = MetricSummary {
            name: name.into(),
            unit,
            scope: MetricScope::PerSegment,
            stats: SummaryStats::from_values(values),
            segments_used: values.len(),
            segments_total: values.len(),
            per_segment: values
                .iter()
                .enumerate()
                .map(|(segment_index, &value)| SegmentValue { segment_index, value })
                .collect(),
            excluded: Vec::new(),
        };
        MetricFeedback {
            name: name.into(),
            summary,
            tag: None,
            reference: None,
            reps: Vec::new(),
        }
    }

    fn payload(segments: Vec<Segment>, per_metric: Vec<MetricFeedback>) -> FeedbackPayload {
        FeedbackPayload {
            movement_type: "squat".into(),
            segment_count: segments.len(),
            completed_segment_count: segments.len(),
            segments,
            assessment: ClipAssessment::from_metrics(&per_metric),
            per_metric,
            data_quality_warnings: Vec::new(),
        }
    }

    #[test]
    fn test_healthy_payload() {
        let check = check_payload_invariants(&payload(
            vec![segment(0, 0, 9), segment(1, 10, 19)],
            vec![
                feedback("knee_angle", MetricUnit::Degrees, &[95.0, 100.0]),
                feedback("knee_symmetry", MetricUnit::Ratio, &[1.0, 0.98]),
            ],
        ));
        assert!(check.is_healthy, "{:?}", check.violations);
        assert_eq!(check.values_checked, 10);
    }

    #[test]
    fn test_detects_violations() {
        let check = check_payload_invariants(&payload(
            vec![segment(0, 0, 9), segment(1, 5, 19)],
            vec![
                feedback("knee_angle", MetricUnit::Degrees, &[95.0, 181.0]),
                feedback("knee_symmetry", MetricUnit::Ratio, &[-0.5, 1.0]),
            ],
        ));
        assert!(!check.is_healthy);
        assert!(check.violations.contains(&InvariantViolation::SegmentOrder { index: 1 }));
        assert!(check
            .violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::AngleOutOfRange { value, .. } if *value == 181.0)));
        assert!(check
            .violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::NegativeRatio { .. })));
    }

    #[test]
    fn test_segment_order_checks() {
        // The first segment has no predecessor; only its own span is checked.
        let check = check_payload_invariants(&payload(vec![segment(0, 0, 0)], Vec::new()));
        assert!(check.is_healthy);

        let check = check_payload_invariants(&payload(
            vec![segment(0, 12, 9), segment(1, 20, 25), segment(2, 25, 30)],
            Vec::new(),
        ));
        assert_eq!(
            check.violations,
            vec![
                InvariantViolation::SegmentOrder { index: 0 },
                InvariantViolation::SegmentOrder { index: 2 },
            ]
        );
    }

    #[test]
    fn test_unaccounted_segment() {
        let mut metric = feedback("knee_angle", MetricUnit::Degrees, &[95.0]);
        metric.summary.segments_total = 2;
        let check = check_payload_invariants(&payload(vec![segment(0, 0, 9), segment(1, 10, 19)], vec![metric]));
        assert_eq!(
            check.violations,
            vec![InvariantViolation::SegmentUnaccounted {
                metric: "knee_angle".into(),
                segment_index: 1
            }]
        );
    }
}
