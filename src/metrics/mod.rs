//! Metric calculators.
//!
//! Each calculator is a stateless [`MetricCalculator`] computing one metric
//! class over the segments of a normalized clip:
//! - [`angle`]: mean articulation angles and range-of-motion extremes
//! - [`symmetry`]: left/right angle ratios
//! - [`tempo`]: rep and phase durations
//! - [`stability`]: anchor sway during the hold window
//! - [`alignment`]: body segment inclination and joint-to-line offsets during
//!   the hold window
//! - [`spacing`]: horizontal spacing ratios during the hold window
//!
//! When the context carries a [`ReferenceProfile`], measurements whose joints
//! never appear in the clip are skipped unless the profile asks for them.
//!
//! Per-segment metrics yield exactly one [`MetricRecord`] per segment: the
//! value, or an omission when too many frames lack the required joints.

use std::fmt;
use std::ops::RangeInclusive;

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::MetricConfig;
use crate::normalizer::NormalizedClip;
use crate::reference::ReferenceProfile;
use crate::segmentation::Segment;
use crate::skeleton::{JointId, SkeletonTopology};

pub mod alignment;
pub mod angle;
pub mod spacing;
pub mod stability;
pub mod symmetry;
pub mod tempo;

pub use alignment::AlignmentCalculator;
pub use angle::AngleCalculator;
pub use spacing::SpacingCalculator;
pub use stability::StabilityCalculator;
pub use symmetry::SymmetryCalculator;
pub use tempo::TempoCalculator;

/// Unit a metric value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetricUnit {
    #[cfg_attr(feature = "serde", serde(rename = "deg"))]
    Degrees,
    #[cfg_attr(feature = "serde", serde(rename = "ratio"))]
    Ratio,
    #[cfg_attr(feature = "serde", serde(rename = "s"))]
    Seconds,
    #[cfg_attr(feature = "serde", serde(rename = "s^2"))]
    SecondsSquared,
    #[cfg_attr(feature = "serde", serde(rename = "body_len"))]
    BodyLengths,
    #[cfg_attr(feature = "serde", serde(rename = "body_len^2"))]
    BodyLengthsSquared,
}

impl MetricUnit {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Degrees => "deg",
            Self::Ratio => "ratio",
            Self::Seconds => "s",
            Self::SecondsSquared => "s^2",
            Self::BodyLengths => "body_len",
            Self::BodyLengthsSquared => "body_len^2",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Whether a metric describes one segment or the clip as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetricScope {
    PerSegment,
    Aggregate,
}

/// A computed metric value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metric {
    pub name: String,
    pub unit: MetricUnit,
    pub scope: MetricScope,
    pub value: f64,
    /// Segment the value belongs to; `None` for aggregate-scope metrics.
    pub segment_index: Option<usize>,
}

impl Metric {
    #[must_use]
    pub fn per_segment(name: impl Into<String>, unit: MetricUnit, segment_index: usize, value: f64) -> Self {
        Self {
            name: name.into(),
            unit,
            scope: MetricScope::PerSegment,
            value,
            segment_index: Some(segment_index),
        }
    }

    #[must_use]
    pub fn aggregate(name: impl Into<String>, unit: MetricUnit, value: f64) -> Self {
        Self {
            name: name.into(),
            unit,
            scope: MetricScope::Aggregate,
            value,
            segment_index: None,
        }
    }
}

/// A per-segment metric that could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOmission {
    pub metric: String,
    pub unit: MetricUnit,
    pub segment_index: usize,
    /// Fraction of the measured frames lacking the required joints.
    pub missing_fraction: f64,
}

/// Calculator output for one metric and segment.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricRecord {
    Computed(Metric),
    Omitted(MetricOmission),
}

impl MetricRecord {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Computed(m) => &m.name,
            Self::Omitted(o) => &o.metric,
        }
    }

    #[must_use]
    pub const fn unit(&self) -> MetricUnit {
        match self {
            Self::Computed(m) => m.unit,
            Self::Omitted(o) => o.unit,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> MetricScope {
        match self {
            Self::Computed(m) => m.scope,
            Self::Omitted(_) => MetricScope::PerSegment,
        }
    }

    #[must_use]
    pub const fn segment_index(&self) -> Option<usize> {
        match self {
            Self::Computed(m) => m.segment_index,
            Self::Omitted(o) => Some(o.segment_index),
        }
    }

    #[must_use]
    pub const fn as_metric(&self) -> Option<&Metric> {
        match self {
            Self::Computed(m) => Some(m),
            Self::Omitted(_) => None,
        }
    }

    #[must_use]
    pub const fn as_omission(&self) -> Option<&MetricOmission> {
        match self {
            Self::Computed(_) => None,
            Self::Omitted(o) => Some(o),
        }
    }
}

/// Metric family produced by a calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricClass {
    Angle,
    Symmetry,
    Tempo,
    Stability,
    Alignment,
    Spacing,
}

impl MetricClass {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Angle => "angle",
            Self::Symmetry => "symmetry",
            Self::Tempo => "tempo",
            Self::Stability => "stability",
            Self::Alignment => "alignment",
            Self::Spacing => "spacing",
        }
    }
}

/// Everything a calculator may read.
#[derive(Debug, Clone, Copy)]
pub struct CalculationContext<'a> {
    pub clip: &'a NormalizedClip,
    pub segments: &'a [Segment],
    pub skeleton: &'a SkeletonTopology,
    pub config: &'a MetricConfig,
    /// Profile whose metrics are always reported.
    pub profile: Option<&'a ReferenceProfile>,
}

impl<'a> CalculationContext<'a> {
    #[must_use]
    pub const fn new(
        clip: &'a NormalizedClip,
        segments: &'a [Segment],
        skeleton: &'a SkeletonTopology,
        config: &'a MetricConfig,
    ) -> Self {
        Self {
            clip,
            segments,
            skeleton,
            config,
            profile: None,
        }
    }

    /// Report only measurements the clip can support or `profile` names.
    #[must_use]
    pub fn with_profile(mut self, profile: &'a ReferenceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Whether every joint in `joints` is present in at least one frame.
    #[must_use]
    pub fn joints_seen(&self, joints: &[JointId]) -> bool {
        joints
            .iter()
            .all(|&joint| self.clip.frames.iter().any(|f| f.joint(joint).is_some()))
    }

    /// Whether metric `name` should be reported.
    ///
    /// `sides` lists alternative joint sets, any one of which yields a value.
    /// Without a profile everything is reported.
    #[must_use]
    pub fn reports(&self, name: &str, sides: &[&[JointId]]) -> bool {
        self.profile.map_or(true, |profile| {
            profile.range(name).is_some() || sides.iter().any(|joints| self.joints_seen(joints))
        })
    }

    /// Frames of the hold window of `segment`.
    #[must_use]
    pub fn hold_window(&self, segment: &Segment) -> RangeInclusive<usize> {
        hold_window(segment, self.config)
    }

    /// Reduce `series` over `frames` into one record for `segment`.
    ///
    /// The metric is omitted when the missing fraction exceeds the configured
    /// bound or `reduce` yields nothing.
    pub fn reduce_window<F>(
        &self,
        name: &str,
        unit: MetricUnit,
        segment: &Segment,
        series: &[Option<f64>],
        frames: RangeInclusive<usize>,
        reduce: F,
    ) -> MetricRecord
    where
        F: FnOnce(&[f64]) -> Option<f64>,
    {
        let window = series.get(frames).unwrap_or_default();
        let values: Vec<f64> = window.iter().flatten().copied().collect();
        let missing_fraction = missing_fraction(window.len(), values.len());

        let value = if missing_fraction > self.config.max_missing_fraction {
            None
        } else {
            reduce(&values)
        };
        match value {
            Some(value) => MetricRecord::Computed(Metric::per_segment(name, unit, segment.index, value)),
            None => MetricRecord::Omitted(MetricOmission {
                metric: name.to_string(),
                unit,
                segment_index: segment.index,
                missing_fraction,
            }),
        }
    }
}

/// Fraction of `total` samples not among the `present` ones; 1 when empty.
#[must_use]
pub fn missing_fraction(total: usize, present: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (total - present) as f64 / total as f64
    }
}

/// Hold sub-window of a segment: `hold_window_fraction` of its frames,
/// at least `min_hold_frames`, centred on the peak and clamped inside the
/// segment.
#[must_use]
pub fn hold_window(segment: &Segment, config: &MetricConfig) -> RangeInclusive<usize> {
    let len = segment.frame_count();
    let width = ((len as f64 * config.hold_window_fraction).ceil() as usize)
        .max(config.min_hold_frames)
        .clamp(1, len);

    let start = segment
        .peak_frame
        .saturating_sub(width / 2)
        .max(segment.start_frame)
        .min(segment.end_frame + 1 - width);
    start..=start + width - 1
}

/// A stateless metric calculator.
pub trait MetricCalculator: Send + Sync {
    fn class(&self) -> MetricClass;

    /// Compute this calculator's metrics for every segment in `ctx`.
    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord>;
}

/// The calculators run by the pipeline, in output order.
#[must_use]
pub fn default_calculators() -> Vec<Box<dyn MetricCalculator>> {
    vec![
        Box::new(AngleCalculator),
        Box::new(SymmetryCalculator),
        Box::new(TempoCalculator),
        Box::new(StabilityCalculator),
        Box::new(AlignmentCalculator),
        Box::new(SpacingCalculator),
    ]
}

/// Run `calculators` and concatenate their records in calculator order.
///
/// With `parallel` the calculators run on the rayon pool; the output is the
/// same either way.
#[must_use]
pub fn run_calculators(
    calculators: &[Box<dyn MetricCalculator>],
    ctx: &CalculationContext<'_>,
    parallel: bool,
) -> Vec<MetricRecord> {
    let outputs: Vec<Vec<MetricRecord>> = if parallel {
        calculators.par_iter().map(|c| c.compute(ctx)).collect()
    } else {
        calculators.iter().map(|c| c.compute(ctx)).collect()
    };
    outputs.into_iter().flatten().collect()
}
