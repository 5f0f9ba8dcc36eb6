//! Repetition segmentation.
//!
//! [`SegmentDetector`] is a small finite-state machine fed one sample of the
//! driving signal per frame:
//!
//! ```text
//!   Idle ──onset──▶ InMotion ──back to rest (armed)──▶ RepComplete ──▶ Idle
//!                      │
//!                      └──back to rest (never armed)──▶ Idle   (jitter)
//! ```
//!
//! A candidate becomes *armed* once its deviation from rest reaches the peak
//! threshold. Motion still in progress when the stream ends becomes a single
//! trailing segment flagged [`SegmentStatus::Incomplete`].

use std::ops::RangeInclusive;

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SegmentationConfig;
use crate::error::Result;
use crate::math::stats::{median, min_max};
use crate::normalizer::NormalizedClip;
use crate::reference::ReferenceProfile;
use crate::series::{driving_series, Series};
use crate::skeleton::SkeletonTopology;

/// Whether a segment returned to rest before the clip ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SegmentStatus {
    Complete,
    Incomplete,
}

/// One repetition: a contiguous, inclusive frame span.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Position in the clip's segment list.
    pub index: usize,
    pub start_frame: usize,
    /// Inclusive.
    pub end_frame: usize,
    /// Frame of maximum deviation from rest (the bottom of a squat, the top
    /// of a pull-up).
    pub peak_frame: usize,
    pub motion_type: String,
    pub status: SegmentStatus,
}

impl Segment {
    /// Number of frames spanned.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.end_frame - self.start_frame + 1
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SegmentStatus::Complete
    }

    #[must_use]
    pub const fn frames(&self) -> RangeInclusive<usize> {
        self.start_frame..=self.end_frame
    }
}

/// State of the repetition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    InMotion,
    RepComplete,
}

/// Frame span emitted by the detector before it is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepSpan {
    pub start_frame: usize,
    pub end_frame: usize,
    pub peak_frame: usize,
    pub complete: bool,
}

/// Finite-state repetition detector over a deviation-from-rest signal.
#[derive(Debug, Clone)]
pub struct SegmentDetector {
    config: SegmentationConfig,
    rest: f64,
    state: DetectorState,
    start: usize,
    peak_frame: usize,
    peak_deviation: f64,
    armed: bool,
    last_onset: Option<usize>,
    last_frame: Option<usize>,
}

impl SegmentDetector {
    /// Create a detector that measures deviation from `rest`.
    #[must_use]
    pub fn new(config: SegmentationConfig, rest: f64) -> Self {
        Self {
            config,
            rest,
            state: DetectorState::Idle,
            start: 0,
            peak_frame: 0,
            peak_deviation: 0.0,
            armed: false,
            last_onset: None,
            last_frame: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    #[must_use]
    pub const fn rest_value(&self) -> f64 {
        self.rest
    }

    /// Feed the sample for `frame`. Missing samples never cause transitions.
    ///
    /// Returns the finished span when this sample completes a repetition.
    pub fn step(&mut self, frame: usize, value: Option<f64>) -> Option<RepSpan> {
        self.last_frame = Some(frame);
        if self.state == DetectorState::RepComplete {
            self.state = DetectorState::Idle;
        }
        let deviation = (value? - self.rest).abs();

        match self.state {
            DetectorState::Idle => {
                if deviation >= self.config.onset_threshold && self.onset_allowed(frame) {
                    self.last_onset = Some(frame);
                    self.state = DetectorState::InMotion;
                    self.start = frame;
                    self.peak_frame = frame;
                    self.peak_deviation = deviation;
                    self.armed = deviation >= self.config.peak_threshold;
                }
                None
            }
            DetectorState::InMotion => {
                if deviation > self.peak_deviation {
                    self.peak_deviation = deviation;
                    self.peak_frame = frame;
                }
                if deviation >= self.config.peak_threshold {
                    self.armed = true;
                }
                if deviation > self.config.rest_tolerance {
                    return None;
                }
                if self.armed {
                    self.state = DetectorState::RepComplete;
                    Some(RepSpan {
                        start_frame: self.start,
                        end_frame: frame,
                        peak_frame: self.peak_frame,
                        complete: true,
                    })
                } else {
                    self.state = DetectorState::Idle;
                    None
                }
            }
            DetectorState::RepComplete => None,
        }
    }

    /// End of stream: motion still in progress becomes an incomplete span.
    #[must_use]
    pub fn finish(self) -> Option<RepSpan> {
        match (self.state, self.last_frame) {
            (DetectorState::InMotion, Some(last)) => Some(RepSpan {
                start_frame: self.start,
                end_frame: last,
                peak_frame: self.peak_frame,
                complete: false,
            }),
            _ => None,
        }
    }

    fn onset_allowed(&self, frame: usize) -> bool {
        self.last_onset
            .map_or(true, |prev| frame - prev >= self.config.debounce_frames)
    }
}

/// Result of running the detector over a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDetection {
    pub segments: Vec<Segment>,
    /// The driving signal, one sample per frame.
    pub signal: Series,
    /// Resting value of the driving signal, `None` if it was never observed.
    pub rest_value: Option<f64>,
}

/// Resting value of the driving signal.
///
/// The median of the first run of `baseline_frames` consecutive valid samples
/// that spans no more than `rest_tolerance`. A clip with no still run rests
/// at its first valid sample.
#[must_use]
pub fn rest_value(signal: &[Option<f64>], config: &SegmentationConfig) -> Option<f64> {
    let valid: Vec<f64> = signal.iter().flatten().copied().collect();
    let width = config.baseline_frames.max(1);

    let still = valid.windows(width).find(|window| {
        min_max(window).is_some_and(|(lo, hi)| hi - lo <= config.rest_tolerance)
    });
    match still {
        Some(window) => median(window),
        None => valid.first().copied(),
    }
}

/// Run a detector over a complete series and label the resulting spans.
#[must_use]
pub fn segment_series(
    signal: &[Option<f64>],
    config: &SegmentationConfig,
    motion_type: &str,
) -> Vec<Segment> {
    let Some(rest) = rest_value(signal, config) else {
        return Vec::new();
    };

    let mut detector = SegmentDetector::new(config.clone(), rest);
    let mut spans: Vec<RepSpan> = signal
        .iter()
        .enumerate()
        .filter_map(|(frame, &value)| detector.step(frame, value))
        .collect();
    spans.extend(detector.finish());

    spans
        .into_iter()
        .enumerate()
        .map(|(index, span)| Segment {
            index,
            start_frame: span.start_frame,
            end_frame: span.end_frame,
            peak_frame: span.peak_frame,
            motion_type: motion_type.to_string(),
            status: if span.complete {
                SegmentStatus::Complete
            } else {
                SegmentStatus::Incomplete
            },
        })
        .collect()
}

/// Segment a normalized clip on the profile's driving signal.
///
/// An empty segment list is not an error here; the pipeline turns it into
/// [`MetricsError::NoMotionDetected`](crate::MetricsError::NoMotionDetected).
///
/// # Errors
///
/// Fails only when the driving signal cannot be resolved on `skeleton`.
pub fn detect_segments(
    clip: &NormalizedClip,
    skeleton: &SkeletonTopology,
    profile: &ReferenceProfile,
    config: &SegmentationConfig,
) -> Result<SegmentDetection> {
    let signal = driving_series(clip, skeleton, &profile.driving_signal)?;
    let rest = rest_value(&signal, config);
    let segments = segment_series(&signal, config, &profile.movement_type);

    debug!(
        segments = segments.len(),
        complete = segments.iter().filter(|s| s.is_complete()).count(),
        rest = ?rest,
        "segmented clip"
    );

    Ok(SegmentDetection {
        segments,
        signal,
        rest_value: rest,
    })
}
