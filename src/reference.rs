//! Reference profiles: what a well-executed repetition looks like.
//!
//! A [`ReferenceProfile`] names a movement, says which signal drives rep
//! segmentation, and lists the expected range of each metric. Presets cover
//! the squat, push-up, pull-up, chin-up and deadlift.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::skeleton::SkeletonTopology;

/// Signal the segment detector follows to find repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrivingSignal {
    /// A named articulation (`left_knee_angle`) or bilateral angle
    /// (`knee_angle`, averaged over visible sides), in degrees.
    Articulation(String),
    /// Vertical position of the anchor in body lengths.
    AnchorVertical,
}

impl DrivingSignal {
    /// Shorthand for [`DrivingSignal::Articulation`].
    #[must_use]
    pub fn angle(name: impl Into<String>) -> Self {
        Self::Articulation(name.into())
    }
}

/// Expected range of one metric.
///
/// Values outside `[low, high]` are critical; values inside but further than
/// `tolerance` from `target` deserve a warning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExpectedRange {
    pub low: f64,
    pub high: f64,
    pub target: f64,
    pub tolerance: f64,
}

impl ExpectedRange {
    #[must_use]
    pub const fn new(low: f64, high: f64, target: f64, tolerance: f64) -> Self {
        Self {
            low,
            high,
            target,
            tolerance,
        }
    }

    /// Symmetric range `target ± tolerance` with hard limits at
    /// `target ± limit`.
    #[must_use]
    pub fn around(target: f64, tolerance: f64, limit: f64) -> Self {
        Self::new(target - limit, target + limit, target, tolerance)
    }

    /// Whether `value` lies within `[low, high]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }

    /// Whether `value` lies within `tolerance` of `target`.
    #[must_use]
    pub fn near_target(&self, value: f64) -> bool {
        (value - self.target).abs() <= self.tolerance
    }

    /// # Errors
    ///
    /// Returns an error unless `low <= target <= high`, `tolerance >= 0` and
    /// all bounds are finite.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.low, self.high, self.target, self.tolerance]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(MetricsError::invalid_profile("range bounds must be finite"));
        }
        if !(self.low <= self.target && self.target <= self.high) {
            return Err(MetricsError::invalid_profile(format!(
                "target {} outside [{}, {}]",
                self.target, self.low, self.high
            )));
        }
        if self.tolerance < 0.0 {
            return Err(MetricsError::invalid_profile("tolerance must be non-negative"));
        }
        Ok(())
    }
}

/// Expected range bound to a metric name.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricReference {
    pub metric: String,
    pub range: ExpectedRange,
}

/// Movement-specific expectations used for classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceProfile {
    pub movement_type: String,
    pub driving_signal: DrivingSignal,
    pub ranges: Vec<MetricReference>,
}

impl ReferenceProfile {
    /// Create a profile with no metric ranges.
    #[must_use]
    pub fn new(movement_type: impl Into<String>, driving_signal: DrivingSignal) -> Self {
        Self {
            movement_type: movement_type.into(),
            driving_signal,
            ranges: Vec::new(),
        }
    }

    /// Add or replace the range for `metric`.
    #[must_use]
    pub fn with_range(mut self, metric: impl Into<String>, range: ExpectedRange) -> Self {
        let metric = metric.into();
        if let Some(existing) = self.ranges.iter_mut().find(|r| r.metric == metric) {
            existing.range = range;
        } else {
            self.ranges.push(MetricReference { metric, range });
        }
        self
    }

    /// Expected range for `metric`, if the profile has one.
    #[must_use]
    pub fn range(&self, metric: &str) -> Option<&ExpectedRange> {
        self.ranges
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| &r.range)
    }

    /// Check the ranges and that the driving signal exists in `skeleton`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::InvalidProfile`] describing the first problem.
    pub fn validate(&self, skeleton: &SkeletonTopology) -> Result<()> {
        if self.movement_type.trim().is_empty() {
            return Err(MetricsError::invalid_profile("movement_type is empty"));
        }
        for reference in &self.ranges {
            reference.range.validate().map_err(|e| {
                MetricsError::invalid_profile(format!("{}: {e}", reference.metric))
            })?;
        }
        if let DrivingSignal::Articulation(name) = &self.driving_signal {
            if skeleton.articulation(name).is_none() && skeleton.bilateral_pair(name).is_none() {
                return Err(MetricsError::invalid_profile(format!(
                    "driving signal '{name}' is not defined by the skeleton"
                )));
            }
        }
        Ok(())
    }

    /// Preset profile by movement name (`squat`, `push_up`, `pull_up`,
    /// `chin_up`, `deadlift`).
    #[must_use]
    pub fn for_movement(name: &str) -> Option<Self> {
        match name {
            "squat" => Some(Self::squat()),
            "push_up" => Some(Self::push_up()),
            "pull_up" => Some(Self::pull_up()),
            "chin_up" => Some(Self::chin_up()),
            "deadlift" => Some(Self::deadlift()),
            _ => None,
        }
    }

    /// Names accepted by [`ReferenceProfile::for_movement`].
    pub const MOVEMENTS: [&'static str; 5] = ["squat", "push_up", "pull_up", "chin_up", "deadlift"];

    /// Bodyweight or barbell back squat, side view.
    #[must_use]
    pub fn squat() -> Self {
        Self::new("squat", DrivingSignal::angle("knee_angle"))
            .with_range("knee_angle_min", ExpectedRange::new(45.0, 110.0, 80.0, 15.0))
            .with_range("torso_lean", ExpectedRange::new(0.0, 45.0, 25.0, 15.0))
            .with_range("knee_symmetry", ExpectedRange::around(1.0, 0.05, 0.1))
            .with_range("hip_symmetry", ExpectedRange::around(1.0, 0.05, 0.1))
            .with_range("knee_valgus_ratio", ExpectedRange::new(0.9, 2.0, 1.1, 0.2))
            .with_range("rep_duration", ExpectedRange::new(1.0, 6.0, 2.5, 1.0))
            .with_range("anchor_sway", ExpectedRange::new(0.0, 0.05, 0.0, 0.01))
    }

    /// Push-up, side view.
    #[must_use]
    pub fn push_up() -> Self {
        Self::new("push_up", DrivingSignal::angle("elbow_angle"))
            .with_range("elbow_angle_min", ExpectedRange::new(40.0, 95.0, 75.0, 15.0))
            .with_range("elbow_angle_max", ExpectedRange::new(160.0, 180.0, 172.0, 8.0))
            .with_range("hip_angle_min", ExpectedRange::new(155.0, 180.0, 172.0, 8.0))
            .with_range("hip_line_offset", ExpectedRange::around(0.0, 0.05, 0.08))
            .with_range("elbow_symmetry", ExpectedRange::around(1.0, 0.05, 0.1))
            .with_range("rep_duration", ExpectedRange::new(0.8, 5.0, 2.0, 1.0))
    }

    /// Overhand pull-up.
    #[must_use]
    pub fn pull_up() -> Self {
        Self::new("pull_up", DrivingSignal::angle("elbow_angle"))
            .with_range("elbow_angle_min", ExpectedRange::new(30.0, 85.0, 60.0, 20.0))
            .with_range("elbow_angle_max", ExpectedRange::new(160.0, 180.0, 170.0, 10.0))
            .with_range("torso_lean", ExpectedRange::new(0.0, 35.0, 10.0, 10.0))
            .with_range("elbow_symmetry", ExpectedRange::around(1.0, 0.05, 0.15))
            .with_range("rep_duration", ExpectedRange::new(1.0, 6.0, 2.5, 1.0))
    }

    /// Underhand chin-up; slightly deeper elbow flexion than the pull-up.
    #[must_use]
    pub fn chin_up() -> Self {
        Self {
            movement_type: "chin_up".into(),
            ..Self::pull_up()
        }
        .with_range("elbow_angle_min", ExpectedRange::new(25.0, 85.0, 55.0, 20.0))
    }

    /// Conventional deadlift, side view.
    #[must_use]
    pub fn deadlift() -> Self {
        Self::new("deadlift", DrivingSignal::angle("hip_angle"))
            .with_range("torso_lean", ExpectedRange::new(25.0, 70.0, 45.0, 15.0))
            .with_range("shin_angle", ExpectedRange::new(0.0, 30.0, 15.0, 10.0))
            .with_range("knee_angle_min", ExpectedRange::new(110.0, 170.0, 140.0, 20.0))
            .with_range("rep_duration", ExpectedRange::new(1.0, 6.0, 3.0, 1.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        let skeleton = SkeletonTopology::coco();
        for name in ReferenceProfile::MOVEMENTS {
            let profile = ReferenceProfile::for_movement(name).unwrap();
            assert_eq!(profile.movement_type, name);
            assert!(profile.validate(&skeleton).is_ok(), "{name} invalid");
        }
        assert!(ReferenceProfile::for_movement("burpee").is_none());
    }

    #[test]
    fn test_with_range_replaces() {
        let profile = ReferenceProfile::squat()
            .with_range("knee_angle_min", ExpectedRange::new(60.0, 100.0, 85.0, 10.0));
        assert_eq!(profile.range("knee_angle_min").unwrap().target, 85.0);
        assert_eq!(
            profile
                .ranges
                .iter()
                .filter(|r| r.metric == "knee_angle_min")
                .count(),
            1
        );
    }

    #[test]
    fn test_chin_up_overrides_pull_up() {
        let chin = ReferenceProfile::chin_up();
        assert_eq!(chin.range("elbow_angle_min").unwrap().target, 55.0);
        assert_eq!(chin.range("torso_lean"), ReferenceProfile::pull_up().range("torso_lean"));
    }

    #[test]
    fn test_range_validation() {
        assert!(ExpectedRange::new(10.0, 0.0, 5.0, 1.0).validate().is_err());
        assert!(ExpectedRange::new(0.0, 10.0, 5.0, -1.0).validate().is_err());
        assert!(ExpectedRange::new(0.0, f64::NAN, 5.0, 1.0).validate().is_err());
        assert!(ExpectedRange::around(130.0, 15.0, 40.0).validate().is_ok());
    }

    #[test]
    fn test_unknown_driving_signal() {
        let profile = ReferenceProfile::new("lunge", DrivingSignal::angle("ankle_angle"));
        assert!(profile.validate(&SkeletonTopology::coco()).is_err());
    }
}
