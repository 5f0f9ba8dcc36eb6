//! Movement Metrics Library
//!
//! Rep segmentation and biomechanical metric extraction from pose keypoints.
//!
//! This library turns a sequence of per-frame body keypoints (as produced by a
//! pose-estimation model) into a structured, tagged description of movement
//! quality, ready to be handed to a downstream coaching step.
//!
//! # Features
//!
//! - **Robust normalization**: confidence floor, bounded gap interpolation,
//!   hip-centred and torso-scaled coordinates
//! - **Explicit rep counting**: a finite-state [`SegmentDetector`] with
//!   debounce and peak arming
//! - **Pluggable calculators**: angles, symmetry, tempo, stability, alignment
//!   and spacing behind the [`MetricCalculator`] trait, optionally on rayon
//! - **Clip score**: a [`ClipAssessment`] ranks the issues and scores the clip
//! - **Honest output**: missing data stays missing and every omission is
//!   reported as a [`DataQualityWarning`]
//!
//! # Quick Start
//!
//! ```
//! use movement_metrics::{
//!     extract_metrics, frames_from_rows, FeedbackTag, JointId, ReferenceProfile,
//!     SkeletonTopology,
//! };
//!
//! // Side view of one squat: knees go from 170 to 90 degrees and back.
//! let knee = [170.0, 170.0, 150.0, 130.0, 110.0, 90.0, 110.0, 130.0, 150.0, 170.0];
//! let frames = frames_from_rows(knee.iter().enumerate().map(|(i, &deg): (usize, &f64)| {
//!     let r = (180.0 - deg).to_radians();
//!     let (ax, ay) = (r.sin(), 2.0 + r.cos());
//!     (
//!         i as f64 / 10.0,
//!         vec![
//!             (JointId::LeftShoulder, 0.0, 0.0, 0.9),
//!             (JointId::RightShoulder, 0.0, 0.0, 0.9),
//!             (JointId::LeftHip, 0.0, 1.0, 0.9),
//!             (JointId::RightHip, 0.0, 1.0, 0.9),
//!             (JointId::LeftKnee, 0.0, 2.0, 0.9),
//!             (JointId::RightKnee, 0.0, 2.0, 0.9),
//!             (JointId::LeftAnkle, ax, ay, 0.9),
//!             (JointId::RightAnkle, ax, ay, 0.9),
//!         ],
//!     )
//! }));
//!
//! let payload = extract_metrics(&frames, &SkeletonTopology::coco(), &ReferenceProfile::squat())?;
//! assert_eq!(payload.segment_count, 1);
//!
//! let depth = payload.metric("knee_angle_min").unwrap();
//! assert_eq!(depth.tag, Some(FeedbackTag::Good));
//! # Ok::<(), movement_metrics::MetricsError>(())
//! ```
//!
//! # Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Normalize | [`normalize_frames`] | [`NormalizedClip`] |
//! | Segment | [`detect_segments`] | [`Segment`]s |
//! | Measure | [`run_calculators`] | [`MetricRecord`]s |
//! | Aggregate | [`aggregate()`] | [`MetricSummary`]s |
//! | Classify | [`build_payload`] | [`FeedbackPayload`] |
//!
//! # Presets
//!
//! ```
//! use movement_metrics::{PipelineConfig, ReferenceProfile};
//!
//! let squat = ReferenceProfile::squat();
//! let chin_up = ReferenceProfile::for_movement("chin_up").unwrap();
//! let noisy = PipelineConfig::noisy_capture();
//! assert!(noisy.validate().is_ok());
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod feedback;
pub mod frame;
pub mod math;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod quality;
pub mod reference;
pub mod segmentation;
pub mod series;
pub mod skeleton;
pub mod validation;

// Re-exports for convenient access
pub use aggregate::{aggregate, ExclusionReason, MetricSummary, SegmentExclusion, SegmentValue, SummaryStats};
pub use compare::{compare_payloads, compare_session, MetricDelta, PayloadComparison, TagChange};
pub use config::{MetricConfig, NormalizerConfig, PipelineConfig, SegmentationConfig};
pub use error::{MetricsError, Result};
pub use feedback::{
    build_payload, classify, ClipAssessment, FeedbackPayload, FeedbackTag, Issue, MetricFeedback, RepFeedback,
};
pub use frame::{frames_from_rows, Frame, Keypoint};
pub use metrics::{
    default_calculators, run_calculators, AlignmentCalculator, AngleCalculator, CalculationContext, Metric,
    MetricCalculator, MetricClass, MetricOmission, MetricRecord, MetricScope, MetricUnit, SpacingCalculator,
    StabilityCalculator, SymmetryCalculator, TempoCalculator,
};
pub use normalizer::{normalize_frames, NormalizedClip, NormalizedFrame};
pub use pipeline::{analyze_source, extract_metrics, extract_metrics_batch, extract_metrics_with_config, PoseSource};
pub use quality::{DataQualityWarning, GapReason};
pub use reference::{DrivingSignal, ExpectedRange, MetricReference, ReferenceProfile};
pub use segmentation::{detect_segments, DetectorState, Segment, SegmentDetection, SegmentDetector, SegmentStatus};
pub use skeleton::{
    Articulation, BilateralPair, BodySegment, JointId, LineOffset, SegmentEnd, Side, SkeletonTopology, SpacingRatio,
};
pub use validation::{check_payload_invariants, InvariantViolation, PayloadCheck};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of joints in the COCO keypoint layout.
pub const COCO_JOINTS: usize = JointId::ALL.len();

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_squats(reps: usize, bottom: f64) -> Vec<Frame> {
        let mut angles = vec![170.0; 3];
        for _ in 0..reps {
            for step in 0..=8 {
                let phase = std::f64::consts::PI * step as f64 / 8.0;
                angles.push(170.0 - (170.0 - bottom) * phase.sin());
            }
            angles.extend([170.0; 2]);
        }
        frames_from_rows(angles.iter().enumerate().map(|(i, &deg)| {
            let r = (180.0_f64 - deg).to_radians();
            (
                i as f64 / 15.0,
                vec![
                    (JointId::LeftShoulder, 0.1, 0.0, 0.9),
                    (JointId::RightShoulder, -0.1, 0.0, 0.9),
                    (JointId::LeftHip, 0.1, 1.0, 0.9),
                    (JointId::RightHip, -0.1, 1.0, 0.9),
                    (JointId::LeftKnee, 0.1, 2.0, 0.9),
                    (JointId::RightKnee, -0.1, 2.0, 0.9),
                    (JointId::LeftAnkle, 0.1 + r.sin(), 2.0 + r.cos(), 0.9),
                    (JointId::RightAnkle, -0.1 + r.sin(), 2.0 + r.cos(), 0.9),
                ],
            )
        }))
    }

    #[test]
    fn test_full_pipeline() {
        let frames = generate_squats(3, 85.0);
        let payload = extract_metrics(&frames, &SkeletonTopology::coco(), &ReferenceProfile::squat()).unwrap();

        assert_eq!(payload.segment_count, 3);
        assert_eq!(payload.completed_segment_count, 3);
        assert_eq!(payload.movement_type, "squat");

        let check = check_payload_invariants(&payload);
        assert!(check.is_healthy, "{:?}", check.violations);

        let knee = payload.metric("knee_symmetry").unwrap();
        assert!((knee.summary.mean().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(knee.tag, Some(FeedbackTag::Good));
    }

    #[test]
    fn test_comparison_between_sessions() {
        let skeleton = SkeletonTopology::coco();
        let profile = ReferenceProfile::squat();
        let shallow = extract_metrics(&generate_squats(2, 120.0), &skeleton, &profile).unwrap();
        let deep = extract_metrics(&generate_squats(2, 85.0), &skeleton, &profile).unwrap();

        let cmp = compare_payloads(&shallow, &deep);
        let depth = cmp.metric("knee_angle_min").unwrap();
        assert!(depth.delta.unwrap() < -30.0);
        assert_eq!(depth.change, TagChange::Improved);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(COCO_JOINTS, 17);
    }
}
