//! Classification against a reference profile and the feedback payload.
//!
//! The payload is the only thing handed to downstream consumers: a
//! structured, tagged description of the clip with stable snake_case field
//! names when serialized.
//!
//! A [`ClipAssessment`] condenses the tags into one score: 1.0 minus
//! [`CRITICAL_PENALTY`] per critical metric and [`WARNING_PENALTY`] per
//! warning, floored at 0.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::aggregate::MetricSummary;
use crate::quality::DataQualityWarning;
use crate::reference::{ExpectedRange, ReferenceProfile};
use crate::segmentation::Segment;

/// Verdict for one metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeedbackTag {
    Good,
    Warning,
    Critical,
}

impl FeedbackTag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for FeedbackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outside `[low, high]` is critical, inside but further than `tolerance`
/// from `target` is a warning, anything else is good.
#[must_use]
pub fn classify(value: f64, range: &ExpectedRange) -> FeedbackTag {
    if !range.contains(value) {
        FeedbackTag::Critical
    } else if !range.near_target(value) {
        FeedbackTag::Warning
    } else {
        FeedbackTag::Good
    }
}

/// Score deducted per critical metric.
pub const CRITICAL_PENALTY: f64 = 0.2;
/// Score deducted per metric with a warning.
pub const WARNING_PENALTY: f64 = 0.1;

/// A metric whose clip verdict is not good.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Issue {
    pub metric: String,
    pub tag: FeedbackTag,
}

/// Clip-level verdict over every classified metric.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipAssessment {
    /// In [0, 1]; `None` when no metric was classified.
    pub score: Option<f64>,
    pub good_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    /// Critical issues first, then warnings, each in metric order.
    pub issues: Vec<Issue>,
}

impl ClipAssessment {
    #[must_use]
    pub fn from_metrics(metrics: &[MetricFeedback]) -> Self {
        let count = |tag| metrics.iter().filter(|m| m.tag == Some(tag)).count();
        let (good_count, warning_count, critical_count) = (
            count(FeedbackTag::Good),
            count(FeedbackTag::Warning),
            count(FeedbackTag::Critical),
        );

        let issues = [FeedbackTag::Critical, FeedbackTag::Warning]
            .into_iter()
            .flat_map(|tag| {
                metrics
                    .iter()
                    .filter(move |m| m.tag == Some(tag))
                    .map(move |m| Issue {
                        metric: m.name.clone(),
                        tag,
                    })
            })
            .collect();

        let classified = good_count + warning_count + critical_count;
        let score = (classified > 0).then(|| {
            let penalty =
                CRITICAL_PENALTY * critical_count as f64 + WARNING_PENALTY * warning_count as f64;
            (1.0 - penalty).max(0.0)
        });

        Self {
            score,
            good_count,
            warning_count,
            critical_count,
            issues,
        }
    }
}

/// Tag of a single repetition's value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RepFeedback {
    pub segment_index: usize,
    pub value: f64,
    pub tag: FeedbackTag,
}

/// Summary of one metric with its verdict.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricFeedback {
    pub name: String,
    pub summary: MetricSummary,
    /// Verdict on the clip mean; `None` when the profile has no range for the
    /// metric or no segment contributed.
    pub tag: Option<FeedbackTag>,
    pub reference: Option<ExpectedRange>,
    /// Per-repetition verdicts, empty for metrics without a range.
    pub reps: Vec<RepFeedback>,
}

/// Structured description of one analysed clip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeedbackPayload {
    pub movement_type: String,
    pub segment_count: usize,
    pub completed_segment_count: usize,
    pub segments: Vec<Segment>,
    pub per_metric: Vec<MetricFeedback>,
    pub assessment: ClipAssessment,
    pub data_quality_warnings: Vec<DataQualityWarning>,
}

impl FeedbackPayload {
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricFeedback> {
        self.per_metric.iter().find(|m| m.name == name)
    }

    /// Most severe clip-level tag, `None` when nothing was classified.
    #[must_use]
    pub fn worst_tag(&self) -> Option<FeedbackTag> {
        self.per_metric.iter().filter_map(|m| m.tag).max()
    }

    /// Metrics carrying `tag`.
    pub fn tagged(&self, tag: FeedbackTag) -> impl Iterator<Item = &MetricFeedback> {
        self.per_metric.iter().filter(move |m| m.tag == Some(tag))
    }
}

/// Classify `summaries` against `profile` and assemble the payload.
///
/// Profile metrics absent from `summaries` add a
/// [`DataQualityWarning::ReferenceMetricMissing`] to `warnings`.
#[must_use]
pub fn build_payload(
    profile: &ReferenceProfile,
    segments: Vec<Segment>,
    summaries: Vec<MetricSummary>,
    mut warnings: Vec<DataQualityWarning>,
) -> FeedbackPayload {
    for reference in &profile.ranges {
        if !summaries.iter().any(|s| s.name == reference.metric) {
            warnings.push(DataQualityWarning::ReferenceMetricMissing {
                metric: reference.metric.clone(),
            });
        }
    }

    let per_metric: Vec<MetricFeedback> = summaries
        .into_iter()
        .map(|summary| {
            let reference = profile.range(&summary.name).copied();
            let tag = reference.zip(summary.mean()).map(|(r, mean)| classify(mean, &r));
            let reps = reference
                .map(|r| {
                    summary
                        .per_segment
                        .iter()
                        .map(|v| RepFeedback {
                            segment_index: v.segment_index,
                            value: v.value,
                            tag: classify(v.value, &r),
                        })
                        .collect()
                })
                .unwrap_or_default();
            MetricFeedback {
                name: summary.name.clone(),
                summary,
                tag,
                reference,
                reps,
            }
        })
        .collect();

    FeedbackPayload {
        movement_type: profile.movement_type.clone(),
        segment_count: segments.len(),
        completed_segment_count: segments.iter().filter(|s| s.is_complete()).count(),
        segments,
        assessment: ClipAssessment::from_metrics(&per_metric),
        per_metric,
        data_quality_warnings: warnings,
    }
}
