//! Configuration for the extraction pipeline.
//!
//! This module provides [`PipelineConfig`], which centralizes every policy
//! threshold used by the normalizer, the segment detector and the metric
//! calculators, along with presets for common capture conditions.
//!
//! # Example
//!
//! ```
//! use movement_metrics::PipelineConfig;
//!
//! // Use default configuration
//! let config = PipelineConfig::default();
//!
//! // Use a preset and tweak it
//! let noisy = PipelineConfig::noisy_capture().with_confidence_floor(0.25);
//! assert!(noisy.validate().is_ok());
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Keypoint cleaning parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalizerConfig {
    /// Detections below this confidence are treated as missing.
    pub confidence_floor: f64,

    /// Longest run of missing frames (per joint) that may be interpolated.
    pub max_interpolation_gap: usize,

    /// Minimum fraction of frames that must carry a usable anchor.
    pub min_anchor_fraction: f64,

    /// Exponential smoothing factor in `(0, 1]`, or `None` to disable.
    /// Smaller values smooth harder.
    pub smoothing_alpha: Option<f64>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.35,
            max_interpolation_gap: 5,
            min_anchor_fraction: 0.5,
            smoothing_alpha: None,
        }
    }
}

/// Repetition state machine thresholds.
///
/// All thresholds are deviations from the resting value of the driving
/// signal, in the signal's own unit (degrees for angles, body lengths for the
/// anchor height).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentationConfig {
    /// Deviation that starts a candidate repetition.
    pub onset_threshold: f64,

    /// Deviation that must be reached before a return to rest counts as a rep.
    pub peak_threshold: f64,

    /// Deviation below which the signal is considered back at rest.
    pub rest_tolerance: f64,

    /// Onsets closer than this many frames to the previous onset are ignored.
    pub debounce_frames: usize,

    /// Length of the first still run of valid samples (spread within
    /// `rest_tolerance`) whose median defines the rest value.
    pub baseline_frames: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            onset_threshold: 15.0,
            peak_threshold: 40.0,
            rest_tolerance: 10.0,
            debounce_frames: 3,
            baseline_frames: 3,
        }
    }
}

/// Metric calculator parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricConfig {
    /// Above this fraction of missing frames a metric is omitted for a segment.
    pub max_missing_fraction: f64,

    /// Fraction of the segment, centred on its peak frame, used as the hold
    /// window for stability and alignment metrics.
    pub hold_window_fraction: f64,

    /// Minimum hold window length in frames.
    pub min_hold_frames: usize,

    /// Denominators smaller than this are treated as zero.
    pub numerical_eps: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            max_missing_fraction: 0.3,
            hold_window_fraction: 0.3,
            min_hold_frames: 3,
            numerical_eps: 1e-9,
        }
    }
}

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    pub segmentation: SegmentationConfig,
    pub metrics: MetricConfig,

    /// Run metric calculators concurrently.
    pub parallel: bool,
}

impl PipelineConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        let n = &self.normalizer;
        if !(0.0..=1.0).contains(&n.confidence_floor) {
            return Err(MetricsError::invalid_config(
                "confidence_floor must be in [0, 1]",
            ));
        }
        if !(n.min_anchor_fraction > 0.0 && n.min_anchor_fraction <= 1.0) {
            return Err(MetricsError::invalid_config(
                "min_anchor_fraction must be in (0, 1]",
            ));
        }
        if let Some(alpha) = n.smoothing_alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(MetricsError::invalid_config(
                    "smoothing_alpha must be in (0, 1]",
                ));
            }
        }

        let s = &self.segmentation;
        if s.onset_threshold <= 0.0 {
            return Err(MetricsError::invalid_config(
                "onset_threshold must be positive",
            ));
        }
        if s.peak_threshold < s.onset_threshold {
            return Err(MetricsError::invalid_config(
                "peak_threshold must be >= onset_threshold",
            ));
        }
        if s.rest_tolerance < 0.0 || s.rest_tolerance >= s.onset_threshold {
            return Err(MetricsError::invalid_config(
                "rest_tolerance must be in [0, onset_threshold)",
            ));
        }
        if s.baseline_frames < 1 {
            return Err(MetricsError::invalid_config(
                "baseline_frames must be at least 1",
            ));
        }

        let m = &self.metrics;
        if !(0.0..=1.0).contains(&m.max_missing_fraction) {
            return Err(MetricsError::invalid_config(
                "max_missing_fraction must be in [0, 1]",
            ));
        }
        if !(m.hold_window_fraction > 0.0 && m.hold_window_fraction <= 1.0) {
            return Err(MetricsError::invalid_config(
                "hold_window_fraction must be in (0, 1]",
            ));
        }
        if m.min_hold_frames < 1 {
            return Err(MetricsError::invalid_config(
                "min_hold_frames must be at least 1",
            ));
        }
        if m.numerical_eps <= 0.0 {
            return Err(MetricsError::invalid_config("numerical_eps must be positive"));
        }
        Ok(())
    }

    /// Preset for angle-driven segmentation (degrees). Same as the default.
    #[must_use]
    pub fn angle_driven() -> Self {
        Self::default()
    }

    /// Preset for segmentation on the normalized anchor height, whose unit is
    /// body (torso) lengths.
    #[must_use]
    pub fn anchor_driven() -> Self {
        Self {
            segmentation: SegmentationConfig {
                onset_threshold: 0.1,
                peak_threshold: 0.3,
                rest_tolerance: 0.07,
                ..SegmentationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Preset for low-quality captures: smoothing on, wider gap bound and a
    /// lower confidence floor.
    #[must_use]
    pub fn noisy_capture() -> Self {
        Self {
            normalizer: NormalizerConfig {
                confidence_floor: 0.25,
                max_interpolation_gap: 8,
                smoothing_alpha: Some(0.4),
                ..NormalizerConfig::default()
            },
            segmentation: SegmentationConfig {
                debounce_frames: 5,
                ..SegmentationConfig::default()
            },
            metrics: MetricConfig {
                max_missing_fraction: 0.4,
                ..MetricConfig::default()
            },
            parallel: false,
        }
    }

    /// Set the confidence floor.
    #[must_use]
    pub const fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.normalizer.confidence_floor = floor;
        self
    }

    /// Set the interpolation gap bound.
    #[must_use]
    pub const fn with_max_interpolation_gap(mut self, frames: usize) -> Self {
        self.normalizer.max_interpolation_gap = frames;
        self
    }

    /// Enable exponential smoothing.
    #[must_use]
    pub const fn with_smoothing(mut self, alpha: f64) -> Self {
        self.normalizer.smoothing_alpha = Some(alpha);
        self
    }

    /// Set the onset, peak and rest thresholds of the segment detector.
    #[must_use]
    pub const fn with_thresholds(mut self, onset: f64, peak: f64, rest: f64) -> Self {
        self.segmentation.onset_threshold = onset;
        self.segmentation.peak_threshold = peak;
        self.segmentation.rest_tolerance = rest;
        self
    }

    /// Set the per-segment missing frame tolerance.
    #[must_use]
    pub const fn with_max_missing_fraction(mut self, fraction: f64) -> Self {
        self.metrics.max_missing_fraction = fraction;
        self
    }

    /// Enable or disable concurrent metric calculation.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
