//! End-to-end metric extraction.
//!
//! # Pipeline Overview
//!
//! 1. Validate configuration, skeleton and reference profile
//! 2. Normalize keypoints (confidence floor, gap interpolation, anchor/scale)
//! 3. Segment repetitions on the profile's driving signal
//! 4. Run the metric calculators
//! 5. Aggregate per-segment values into clip statistics
//! 6. Classify against the profile and build the payload

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::aggregate;
use crate::config::PipelineConfig;
use crate::error::{MetricsError, Result};
use crate::feedback::{build_payload, FeedbackPayload};
use crate::frame::Frame;
use crate::metrics::{default_calculators, run_calculators, CalculationContext, MetricRecord};
use crate::normalizer::normalize_frames;
use crate::quality::DataQualityWarning;
use crate::reference::ReferenceProfile;
use crate::segmentation::detect_segments;
use crate::skeleton::SkeletonTopology;

/// Anything that can produce a frame sequence, such as a pose-estimation
/// model wrapped by the caller.
pub trait PoseSource {
    /// # Errors
    ///
    /// Implementations report their own failures as [`MetricsError`].
    fn frames(&self) -> Result<Vec<Frame>>;
}

impl PoseSource for Vec<Frame> {
    fn frames(&self) -> Result<Vec<Frame>> {
        Ok(self.clone())
    }
}

impl PoseSource for [Frame] {
    fn frames(&self) -> Result<Vec<Frame>> {
        Ok(self.to_vec())
    }
}

/// Extract metrics with the default [`PipelineConfig`].
///
/// # Errors
///
/// See [`extract_metrics_with_config`].
///
/// # Example
///
/// ```
/// use movement_metrics::{extract_metrics, MetricsError, ReferenceProfile, SkeletonTopology};
///
/// // A clip in which nobody moves.
/// let frames: Vec<movement_metrics::Frame> = Vec::new();
/// let result = extract_metrics(&frames, &SkeletonTopology::coco(), &ReferenceProfile::squat());
/// assert!(matches!(result, Err(MetricsError::InvalidInput(_))));
/// ```
pub fn extract_metrics(
    frames: &[Frame],
    skeleton: &SkeletonTopology,
    profile: &ReferenceProfile,
) -> Result<FeedbackPayload> {
    extract_metrics_with_config(frames, skeleton, profile, &PipelineConfig::default())
}

/// Run the full pipeline on one clip.
///
/// Data-quality problems that still allow a best-effort answer are returned
/// inside the payload as warnings.
///
/// # Errors
///
/// - [`MetricsError::InvalidConfig`] / [`MetricsError::InvalidProfile`] for
///   bad inputs to the engine itself
/// - [`MetricsError::InvalidInput`] / [`MetricsError::NonMonotonicTimestamps`]
///   for a malformed clip
/// - [`MetricsError::InsufficientData`] when normalization has too little to
///   work with
/// - [`MetricsError::NoMotionDetected`] when no repetition starts
#[instrument(skip_all, fields(movement = %profile.movement_type, frames = frames.len()))]
pub fn extract_metrics_with_config(
    frames: &[Frame],
    skeleton: &SkeletonTopology,
    profile: &ReferenceProfile,
    config: &PipelineConfig,
) -> Result<FeedbackPayload> {
    config.validate()?;
    skeleton.validate()?;
    profile.validate(skeleton)?;

    let clip = normalize_frames(frames, skeleton, &config.normalizer)?;
    debug!(body_scale = clip.body_scale, warnings = clip.warnings.len(), "normalized clip");

    let detection = detect_segments(&clip, skeleton, profile, &config.segmentation)?;
    if detection.segments.is_empty() {
        return Err(MetricsError::no_motion(clip.len()));
    }
    let segments = detection.segments;

    let mut warnings = clip.warnings.clone();
    for segment in segments.iter().filter(|s| !s.is_complete()) {
        warn!(segment = segment.index, "trailing segment never returned to rest");
        warnings.push(DataQualityWarning::IncompleteSegment {
            segment_index: segment.index,
            start_frame: segment.start_frame,
            end_frame: segment.end_frame,
        });
    }

    let ctx = CalculationContext::new(&clip, &segments, skeleton, &config.metrics).with_profile(profile);
    let records = run_calculators(&default_calculators(), &ctx, config.parallel);
    for omission in records.iter().filter_map(MetricRecord::as_omission) {
        warn!(
            metric = %omission.metric,
            segment = omission.segment_index,
            missing_fraction = omission.missing_fraction,
            "metric omitted"
        );
        warnings.push(DataQualityWarning::MetricOmitted {
            metric: omission.metric.clone(),
            segment_index: omission.segment_index,
            missing_fraction: omission.missing_fraction,
        });
    }

    let summaries = aggregate(&records, &segments);
    let payload = build_payload(profile, segments, summaries, warnings);

    info!(
        segments = payload.segment_count,
        completed = payload.completed_segment_count,
        metrics = payload.per_metric.len(),
        warnings = payload.data_quality_warnings.len(),
        "extracted movement metrics"
    );
    Ok(payload)
}

/// Analyse several clips in parallel; results keep the input order.
#[must_use]
pub fn extract_metrics_batch(
    clips: &[Vec<Frame>],
    skeleton: &SkeletonTopology,
    profile: &ReferenceProfile,
    config: &PipelineConfig,
) -> Vec<Result<FeedbackPayload>> {
    clips
        .par_iter()
        .map(|frames| extract_metrics_with_config(frames, skeleton, profile, config))
        .collect()
}

/// Pull frames from `source` and run the pipeline on them.
///
/// # Errors
///
/// Propagates the source's error, then those of
/// [`extract_metrics_with_config`].
pub fn analyze_source<S: PoseSource + ?Sized>(
    source: &S,
    skeleton: &SkeletonTopology,
    profile: &ReferenceProfile,
    config: &PipelineConfig,
) -> Result<FeedbackPayload> {
    let frames = source.frames()?;
    extract_metrics_with_config(&frames, skeleton, profile, config)
}
