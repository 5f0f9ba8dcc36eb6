//! Clip-to-clip comparison of feedback payloads.
//!
//! Used to summarise a session of several attempts at the same movement:
//! per-metric change in the clip mean, whether its verdict improved, and the
//! change in clip score.

use crate::feedback::{FeedbackPayload, FeedbackTag};

/// Direction of a verdict change between two clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChange {
    Improved,
    Regressed,
    Unchanged,
    /// One side has no verdict.
    Unclassified,
}

impl TagChange {
    #[must_use]
    pub fn between(before: Option<FeedbackTag>, after: Option<FeedbackTag>) -> Self {
        match (before, after) {
            (Some(b), Some(a)) if a < b => Self::Improved,
            (Some(b), Some(a)) if a > b => Self::Regressed,
            (Some(_), Some(_)) => Self::Unchanged,
            _ => Self::Unclassified,
        }
    }
}

/// Change of one metric present in both payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDelta {
    pub name: String,
    pub before_mean: Option<f64>,
    pub after_mean: Option<f64>,
    /// `after - before`, when both means exist.
    pub delta: Option<f64>,
    pub before_tag: Option<FeedbackTag>,
    pub after_tag: Option<FeedbackTag>,
    pub change: TagChange,
}

/// Comparison of two payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadComparison {
    /// Metrics in both payloads, in the order of `before`.
    pub metrics: Vec<MetricDelta>,
    pub only_before: Vec<String>,
    pub only_after: Vec<String>,
    /// Change in [`ClipAssessment::score`], when both clips have one.
    ///
    /// [`ClipAssessment::score`]: crate::feedback::ClipAssessment::score
    pub score_delta: Option<f64>,
}

impl PayloadComparison {
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricDelta> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn improved(&self) -> impl Iterator<Item = &MetricDelta> {
        self.metrics.iter().filter(|m| m.change == TagChange::Improved)
    }

    pub fn regressed(&self) -> impl Iterator<Item = &MetricDelta> {
        self.metrics.iter().filter(|m| m.change == TagChange::Regressed)
    }
}

/// Compare `after` against `before`.
#[must_use]
pub fn compare_payloads(before: &FeedbackPayload, after: &FeedbackPayload) -> PayloadComparison {
    let mut comparison = PayloadComparison::default();

    for b in &before.per_metric {
        let Some(a) = after.metric(&b.name) else {
            comparison.only_before.push(b.name.clone());
            continue;
        };
        let before_mean = b.summary.mean();
        let after_mean = a.summary.mean();
        comparison.metrics.push(MetricDelta {
            name: b.name.clone(),
            before_mean,
            after_mean,
            delta: before_mean.zip(after_mean).map(|(b, a)| a - b),
            before_tag: b.tag,
            after_tag: a.tag,
            change: TagChange::between(b.tag, a.tag),
        });
    }
    comparison.only_after = after
        .per_metric
        .iter()
        .filter(|a| before.metric(&a.name).is_none())
        .map(|a| a.name.clone())
        .collect();
    comparison.score_delta = before
        .assessment
        .score
        .zip(after.assessment.score)
        .map(|(b, a)| a - b);

    comparison
}

/// Compare each payload with the one before it.
#[must_use]
pub fn compare_session(payloads: &[FeedbackPayload]) -> Vec<PayloadComparison> {
    payloads
        .windows(2)
        .map(|w| compare_payloads(&w[0], &w[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{MetricSummary, SummaryStats};
    use crate::feedback::{ClipAssessment, MetricFeedback};
    use crate::metrics::{MetricScope, MetricUnit};
    use approx::assert_relative_eq;

    fn metric(name: &str, mean: f64, tag: FeedbackTag) -> MetricFeedback {
        MetricFeedback {
            name: name.into(),
            summary: MetricSummary {
                name: name.into(),
                unit: MetricUnit::Degrees,
                scope: MetricScope::PerSegment,
                stats: Some(SummaryStats::constant(mean)),
                segments_used: 1,
                segments_total: 1,
                per_segment: Vec::new(),
                excluded: Vec::new(),
            },
            tag: Some(tag),
            reference: None,
            reps: Vec::new(),
        }
    }

    fn payload(per_metric: Vec<MetricFeedback>) -> FeedbackPayload {
        FeedbackPayload {
            movement_type: "squat".into(),
            segment_count: 1,
            completed_segment_count: 1,
            segments: Vec::new(),
            assessment: ClipAssessment::from_metrics(&per_metric),
            per_metric,
            data_quality_warnings: Vec::new(),
        }
    }

    #[test]
    fn test_self_comparison_is_unchanged() {
        let p = payload(vec![metric("knee_angle_min", 95.0, FeedbackTag::Warning)]);
        let cmp = compare_payloads(&p, &p);
        let delta = cmp.metric("knee_angle_min").unwrap();
        assert_relative_eq!(delta.delta.unwrap(), 0.0);
        assert_eq!(delta.change, TagChange::Unchanged);
        assert!(cmp.only_before.is_empty() && cmp.only_after.is_empty());
        assert_relative_eq!(cmp.score_delta.unwrap(), 0.0);
    }

    #[test]
    fn test_deltas_and_tag_changes() {
        let before = payload(vec![
            metric("knee_angle_min", 110.0, FeedbackTag::Critical),
            metric("torso_lean", 20.0, FeedbackTag::Good),
            metric("hip_symmetry", 1.0, FeedbackTag::Good),
        ]);
        let after = payload(vec![
            metric("knee_angle_min", 85.0, FeedbackTag::Good),
            metric("torso_lean", 42.0, FeedbackTag::Warning),
            metric("knee_symmetry", 1.0, FeedbackTag::Good),
        ]);
        let cmp = compare_payloads(&before, &after);

        assert_relative_eq!(cmp.metric("knee_angle_min").unwrap().delta.unwrap(), -25.0);
        assert_eq!(cmp.improved().count(), 1);
        assert_eq!(cmp.regressed().next().unwrap().name, "torso_lean");
        assert_eq!(cmp.only_before, ["hip_symmetry"]);
        assert_eq!(cmp.only_after, ["knee_symmetry"]);
        // One critical and two good, then one warning and two good.
        assert_relative_eq!(cmp.score_delta.unwrap(), 0.1, epsilon = 1e-12);

        let session = compare_session(&[before, after.clone(), after]);
        assert_eq!(session.len(), 2);
        assert_eq!(session[1].improved().count(), 0);
    }

    #[test]
    fn test_unclassified_change() {
        assert_eq!(TagChange::between(None, Some(FeedbackTag::Good)), TagChange::Unclassified);
    }
}
