//! Clip-level aggregation of per-segment metrics.
//!
//! Each metric name becomes one [`MetricSummary`]. Only complete segments
//! with a computed value contribute to the statistics; every other segment is
//! listed in `excluded` with its reason, so no segment disappears silently.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::stats::{linear_slope, mean, min_max, sample_std_dev};
use crate::metrics::{MetricRecord, MetricScope, MetricUnit};
use crate::segmentation::Segment;

/// Why a segment did not contribute to a metric's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExclusionReason {
    /// The segment never returned to rest.
    Incomplete,
    /// The metric was omitted for the segment.
    Omitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentExclusion {
    pub segment_index: usize,
    pub reason: ExclusionReason,
}

/// A metric value for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentValue {
    pub segment_index: usize,
    pub value: f64,
}

/// Statistics over the contributing segments.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SummaryStats {
    pub mean: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Last minus first contributing value.
    pub trend: f64,
    /// Least-squares change per repetition.
    pub slope: f64,
}

impl SummaryStats {
    /// Statistics of `values` in temporal order, `None` when empty.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let (min, max) = min_max(values)?;
        let first = values.first()?;
        let last = values.last()?;
        Some(Self {
            mean,
            std_dev: sample_std_dev(values)?,
            min,
            max,
            trend: last - first,
            slope: linear_slope(values),
        })
    }

    /// Statistics of a single clip-level value.
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self {
            mean: value,
            std_dev: 0.0,
            min: value,
            max: value,
            trend: 0.0,
            slope: 0.0,
        }
    }
}

/// Clip-level summary of one metric.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricSummary {
    pub name: String,
    pub unit: MetricUnit,
    pub scope: MetricScope,
    /// `None` when no segment contributed.
    pub stats: Option<SummaryStats>,
    pub segments_used: usize,
    pub segments_total: usize,
    /// Every computed per-segment value in temporal order, contributing or not.
    pub per_segment: Vec<SegmentValue>,
    pub excluded: Vec<SegmentExclusion>,
}

impl MetricSummary {
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        self.stats.map(|s| s.mean)
    }

    /// Value recorded for `segment_index`, if any.
    #[must_use]
    pub fn segment_value(&self, segment_index: usize) -> Option<f64> {
        self.per_segment
            .iter()
            .find(|v| v.segment_index == segment_index)
            .map(|v| v.value)
    }
}

/// Group `records` by metric name and summarise each group.
///
/// Metric order follows first appearance in `records`.
#[must_use]
pub fn aggregate(records: &[MetricRecord], segments: &[Segment]) -> Vec<MetricSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&MetricRecord>> = HashMap::new();
    for record in records {
        let name = record.name();
        groups
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .filter_map(|name| {
            let group = groups.get(name)?;
            let first = group.first()?;
            Some(match first.scope() {
                MetricScope::Aggregate => summarize_clip_metric(name, first, segments),
                MetricScope::PerSegment => summarize_segments(name, first.unit(), group, segments),
            })
        })
        .collect()
}

fn summarize_segments(
    name: &str,
    unit: MetricUnit,
    group: &[&MetricRecord],
    segments: &[Segment],
) -> MetricSummary {
    let mut per_segment = Vec::new();
    let mut excluded = Vec::new();
    let mut used = Vec::new();

    for segment in segments {
        let value = group
            .iter()
            .find(|r| r.segment_index() == Some(segment.index))
            .and_then(|r| r.as_metric())
            .map(|m| m.value);

        if let Some(value) = value {
            per_segment.push(SegmentValue {
                segment_index: segment.index,
                value,
            });
        }
        let reason = if !segment.is_complete() {
            Some(ExclusionReason::Incomplete)
        } else if value.is_none() {
            Some(ExclusionReason::Omitted)
        } else {
            None
        };
        match (reason, value) {
            (Some(reason), _) => excluded.push(SegmentExclusion {
                segment_index: segment.index,
                reason,
            }),
            (None, Some(value)) => used.push(value),
            (None, None) => {}
        }
    }

    MetricSummary {
        name: name.to_string(),
        unit,
        scope: MetricScope::PerSegment,
        stats: SummaryStats::from_values(&used),
        segments_used: used.len(),
        segments_total: segments.len(),
        per_segment,
        excluded,
    }
}

fn summarize_clip_metric(name: &str, record: &MetricRecord, segments: &[Segment]) -> MetricSummary {
    let excluded: Vec<SegmentExclusion> = segments
        .iter()
        .filter(|s| !s.is_complete())
        .map(|s| SegmentExclusion {
            segment_index: s.index,
            reason: ExclusionReason::Incomplete,
        })
        .collect();

    MetricSummary {
        name: name.to_string(),
        unit: record.unit(),
        scope: MetricScope::Aggregate,
        stats: record.as_metric().map(|m| SummaryStats::constant(m.value)),
        segments_used: segments.len() - excluded.len(),
        segments_total: segments.len(),
        per_segment: Vec::new(),
        excluded,
    }
}
