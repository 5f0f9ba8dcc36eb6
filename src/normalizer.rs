//! Keypoint normalization.
//!
//! Turns raw, noisy frames into a [`NormalizedClip`] of the same length:
//!
//! 1. Reject detections below the confidence floor
//! 2. Interpolate short gaps on the timestamp axis
//! 3. Optionally smooth each joint track
//! 4. Re-centre on the hip midpoint and divide by torso length

use tracing::{debug, warn};

use crate::config::NormalizerConfig;
use crate::error::{MetricsError, Result};
use crate::frame::Frame;
use crate::math::geometry::{midpoint, pair_center, Point};
use crate::math::stats::median;
use crate::quality::{DataQualityWarning, GapReason};
use crate::skeleton::{JointId, SkeletonTopology};

const JOINT_COUNT: usize = JointId::ALL.len();

/// One cleaned frame in body-relative coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    /// Joint positions indexed by [`JointId::index`], relative to the anchor
    /// and in body-length units.
    pub joints: [Option<Point>; JOINT_COUNT],
    /// Anchor position in body-length units, before re-centring. Missing when
    /// the frame lacks an anchor joint that the clip otherwise shows, so the
    /// track never jumps between the midpoint and a single joint.
    pub anchor: Option<Point>,
}

impl NormalizedFrame {
    const fn empty() -> Self {
        Self {
            joints: [None; JOINT_COUNT],
            anchor: None,
        }
    }

    #[must_use]
    pub fn joint(&self, joint: JointId) -> Option<Point> {
        self.joints[joint.index()]
    }

    /// All requested joints, or `None` if any is missing.
    #[must_use]
    pub fn all<const N: usize>(&self, joints: [JointId; N]) -> Option<[Point; N]> {
        let mut out = [Point::origin(); N];
        for (slot, joint) in out.iter_mut().zip(joints) {
            *slot = self.joint(joint)?;
        }
        Some(out)
    }
}

impl Default for NormalizedFrame {
    fn default() -> Self {
        Self::empty()
    }
}

/// Output of the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedClip {
    pub frames: Vec<NormalizedFrame>,
    /// Timestamps in seconds, one per frame.
    pub timestamps: Vec<f64>,
    /// Torso length in input units used as the scale reference.
    pub body_scale: f64,
    pub warnings: Vec<DataQualityWarning>,
}

impl NormalizedClip {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

type Track = Vec<Option<Point>>;

/// Clean, interpolate and normalize a clip.
///
/// # Errors
///
/// - [`MetricsError::InvalidInput`] for an empty clip
/// - [`MetricsError::NonMonotonicTimestamps`] if time goes backwards
/// - [`MetricsError::InsufficientData`] if too few frames carry an anchor
/// - [`MetricsError::UndefinedBodyScale`] if no frame yields a body scale
pub fn normalize_frames(
    frames: &[Frame],
    skeleton: &SkeletonTopology,
    config: &NormalizerConfig,
) -> Result<NormalizedClip> {
    validate_frames(frames)?;

    let n = frames.len();
    let timestamps: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
    let mut warnings = Vec::new();

    // Per-joint tracks of trusted raw positions.
    let mut tracks: Vec<Track> = vec![vec![None; n]; JOINT_COUNT];
    for (i, frame) in frames.iter().enumerate() {
        for joint in JointId::ALL {
            if let Some(kp) = frame.keypoint(joint) {
                if kp.is_usable(config.confidence_floor) {
                    tracks[joint.index()][i] = Some(Point::new(kp.x, kp.y));
                }
            }
        }
    }

    for joint in JointId::ALL {
        let track = &mut tracks[joint.index()];
        if track.iter().all(Option::is_none) {
            if frames.iter().any(|f| f.keypoint(joint).is_some()) {
                warn!(%joint, "joint never detected above confidence floor");
                warnings.push(DataQualityWarning::JointUndetected { joint });
            }
            continue;
        }
        warnings.extend(interpolate_gaps(
            track,
            &timestamps,
            config.max_interpolation_gap,
            joint,
        ));
        if let Some(alpha) = config.smoothing_alpha {
            smooth_track(track, alpha);
        }
    }

    let (anchor_a, anchor_b) = skeleton.anchor();
    let anchors: Track = (0..n)
        .map(|i| pair_center(tracks[anchor_a.index()][i], tracks[anchor_b.index()][i]))
        .collect();
    let body_anchors = body_anchor_track(&tracks[anchor_a.index()], &tracks[anchor_b.index()]);

    let usable = anchors.iter().filter(|a| a.is_some()).count();
    if (usable as f64) < config.min_anchor_fraction * n as f64 {
        return Err(MetricsError::insufficient_data(
            usable,
            n,
            config.min_anchor_fraction,
        ));
    }

    let (scale_a, scale_b) = skeleton.scale_reference();
    let torso_lengths: Vec<f64> = (0..n)
        .filter_map(|i| {
            let top = pair_center(tracks[scale_a.index()][i], tracks[scale_b.index()][i])?;
            let anchor = anchors[i]?;
            Some((top - anchor).norm())
        })
        .filter(|len| *len > 0.0 && len.is_finite())
        .collect();
    let body_scale = match median(&torso_lengths) {
        Some(scale) if scale > 0.0 => scale,
        _ => return Err(MetricsError::UndefinedBodyScale { total_frames: n }),
    };

    let missing_anchor = n - usable;
    if missing_anchor > 0 {
        warn!(missing_anchor, total = n, "frames without anchor");
        warnings.push(DataQualityWarning::MissingAnchor {
            frames: missing_anchor,
            total_frames: n,
        });
    }

    let normalized: Vec<NormalizedFrame> = (0..n)
        .map(|i| {
            let Some(anchor) = anchors[i] else {
                return NormalizedFrame::empty();
            };
            let mut frame = NormalizedFrame::empty();
            for joint in JointId::ALL {
                frame.joints[joint.index()] = tracks[joint.index()][i]
                    .map(|p| Point::from((p - anchor) / body_scale));
            }
            frame.anchor = body_anchors[i].map(|a| Point::from(a.coords / body_scale));
            frame
        })
        .collect();

    debug!(
        frames = n,
        usable_anchor = usable,
        body_scale,
        warnings = warnings.len(),
        "normalized clip"
    );

    Ok(NormalizedClip {
        frames: normalized,
        timestamps,
        body_scale,
        warnings,
    })
}

fn validate_frames(frames: &[Frame]) -> Result<()> {
    if frames.is_empty() {
        return Err(MetricsError::invalid_input("clip contains no frames"));
    }
    for (i, frame) in frames.iter().enumerate() {
        if !frame.timestamp.is_finite() {
            return Err(MetricsError::invalid_input(format!(
                "frame {i} has a non-finite timestamp"
            )));
        }
        if i > 0 && frame.timestamp < frames[i - 1].timestamp {
            return Err(MetricsError::NonMonotonicTimestamps { index: i });
        }
    }
    Ok(())
}

/// Anchor positions for tracking body motion.
///
/// A lone anchor joint counts only when its partner is never seen in the
/// clip, so the track never mixes midpoints with single joints.
fn body_anchor_track(a: &Track, b: &Track) -> Track {
    let a_seen = a.iter().any(Option::is_some);
    let b_seen = b.iter().any(Option::is_some);
    a.iter()
        .zip(b)
        .map(|(&pa, &pb)| match (pa, pb) {
            (Some(pa), Some(pb)) => Some(midpoint(&pa, &pb)),
            (Some(p), None) if !b_seen => Some(p),
            (None, Some(p)) if !a_seen => Some(p),
            _ => None,
        })
        .collect()
}

/// Fill bracketed gaps no longer than `max_gap` frames by linear interpolation
/// on the timestamp axis. Returns a warning for every gap left open.
fn interpolate_gaps(
    track: &mut Track,
    timestamps: &[f64],
    max_gap: usize,
    joint: JointId,
) -> Vec<DataQualityWarning> {
    let n = track.len();
    let mut warnings = Vec::new();
    let mut i = 0;

    while i < n {
        if track[i].is_some() {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && track[i].is_none() {
            i += 1;
        }
        let end = i - 1;
        let len = i - start;

        let before = start.checked_sub(1).and_then(|b| track[b].map(|p| (b, p)));
        let after = track.get(i).copied().flatten().map(|p| (i, p));

        match (before, after) {
            (Some((b, pb)), Some((a, pa))) if len <= max_gap => {
                let span = timestamps[a] - timestamps[b];
                for k in start..=end {
                    let t = if span > 0.0 {
                        (timestamps[k] - timestamps[b]) / span
                    } else {
                        (k - b) as f64 / (a - b) as f64
                    };
                    track[k] = Some(pb + (pa - pb) * t);
                }
            }
            (Some(_), Some(_)) => {
                warn!(%joint, start, end, len, "gap exceeds interpolation bound");
                warnings.push(DataQualityWarning::GapNotInterpolated {
                    joint,
                    start_frame: start,
                    end_frame: end,
                    reason: GapReason::TooLong,
                });
            }
            _ => {
                debug!(%joint, start, end, "gap at clip edge left missing");
                warnings.push(DataQualityWarning::GapNotInterpolated {
                    joint,
                    start_frame: start,
                    end_frame: end,
                    reason: GapReason::Unbracketed,
                });
            }
        }
    }
    warnings
}

/// Exponential smoothing, restarting after every missing frame.
fn smooth_track(track: &mut Track, alpha: f64) {
    let mut prev: Option<Point> = None;
    for slot in track.iter_mut() {
        *slot = match (*slot, prev) {
            (Some(p), Some(s)) => Some(Point::from(p.coords * alpha + s.coords * (1.0 - alpha))),
            (current, _) => current,
        };
        prev = *slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Keypoint;
    use approx::assert_relative_eq;

    /// Standing figure: hips at y=100, shoulders at y=50 (torso length 50).
    fn standing_frame(i: usize, offset_x: f64) -> Frame {
        let mut frame = Frame::new(i as f64 * 0.1);
        for (joint, x, y) in [
            (JointId::LeftShoulder, 90.0, 50.0),
            (JointId::RightShoulder, 110.0, 50.0),
            (JointId::LeftHip, 90.0, 100.0),
            (JointId::RightHip, 110.0, 100.0),
            (JointId::LeftKnee, 90.0, 150.0),
            (JointId::RightKnee, 110.0, 150.0),
        ] {
            frame = frame.with_keypoint(Keypoint::new(joint, x + offset_x, y, 0.9, i));
        }
        frame
    }

    #[test]
    fn test_recentre_and_scale() {
        let frames: Vec<Frame> = (0..4).map(|i| standing_frame(i, 30.0)).collect();
        let clip =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap();

        assert_eq!(clip.len(), 4);
        assert_relative_eq!(clip.body_scale, 50.0);
        let knee = clip.frames[0].joint(JointId::LeftKnee).unwrap();
        assert_relative_eq!(knee.x, -0.2);
        assert_relative_eq!(knee.y, 1.0);
        let anchor = clip.frames[0].anchor.unwrap();
        assert_relative_eq!(anchor.x, 130.0 / 50.0);
    }

    #[test]
    fn test_low_confidence_marked_missing() {
        let mut frames: Vec<Frame> = (0..3).map(|i| standing_frame(i, 0.0)).collect();
        for frame in &mut frames {
            for kp in &mut frame.keypoints {
                if kp.joint == JointId::LeftKnee {
                    kp.confidence = 0.1;
                }
            }
        }
        let clip =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap();
        assert!(clip.frames.iter().all(|f| f.joint(JointId::LeftKnee).is_none()));
        assert!(clip.warnings.contains(&DataQualityWarning::JointUndetected {
            joint: JointId::LeftKnee
        }));
    }

    #[test]
    fn test_short_gap_interpolated_on_time_axis() {
        let mut track: Track = vec![
            Some(Point::new(0.0, 0.0)),
            None,
            None,
            Some(Point::new(3.0, 6.0)),
        ];
        let timestamps = [0.0, 0.1, 0.2, 0.3];
        let warnings = interpolate_gaps(&mut track, &timestamps, 5, JointId::LeftKnee);
        assert!(warnings.is_empty());
        let p = track[1].unwrap();
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_long_and_edge_gaps_left_missing() {
        let mut track: Track = vec![None, Some(Point::new(0.0, 0.0))];
        track.extend(std::iter::repeat(None).take(6));
        track.push(Some(Point::new(1.0, 1.0)));
        let timestamps: Vec<f64> = (0..track.len()).map(|i| i as f64).collect();

        let warnings = interpolate_gaps(&mut track, &timestamps, 5, JointId::LeftAnkle);
        assert_eq!(warnings.len(), 2);
        assert!(track[0].is_none());
        assert!(track[2..8].iter().all(Option::is_none));
        assert!(matches!(
            warnings[1],
            DataQualityWarning::GapNotInterpolated {
                start_frame: 2,
                end_frame: 7,
                reason: GapReason::TooLong,
                ..
            }
        ));
    }

    #[test]
    fn test_smoothing_restarts_after_gap() {
        let mut track: Track = vec![
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(10.0, 0.0)),
            None,
            Some(Point::new(50.0, 0.0)),
        ];
        smooth_track(&mut track, 0.5);
        assert_relative_eq!(track[1].unwrap().x, 5.0);
        assert!(track[2].is_none());
        assert_relative_eq!(track[3].unwrap().x, 50.0);
    }

    #[test]
    fn test_insufficient_anchor() {
        let mut frames: Vec<Frame> = (0..10).map(|i| standing_frame(i, 0.0)).collect();
        for frame in frames.iter_mut().skip(2) {
            frame
                .keypoints
                .retain(|k| !matches!(k.joint, JointId::LeftHip | JointId::RightHip));
        }
        let err =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap_err();
        assert!(matches!(
            err,
            MetricsError::InsufficientData {
                usable_frames: 2,
                total_frames: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_anchor_track_skips_half_visible_hips() {
        // Still figure; the left hip is lost over frames 3..=8, beyond the gap bound.
        let mut frames: Vec<Frame> = (0..14).map(|i| standing_frame(i, 0.0)).collect();
        for frame in &mut frames[3..9] {
            frame.keypoints.retain(|k| k.joint != JointId::LeftHip);
        }
        let clip =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap();

        assert!(clip.frames[3..9].iter().all(|f| f.anchor.is_none()));
        let anchors: Vec<Point> = clip.frames.iter().filter_map(|f| f.anchor).collect();
        assert_eq!(anchors.len(), 8);
        for anchor in &anchors {
            assert_relative_eq!(anchor.x, 2.0);
            assert_relative_eq!(anchor.y, 2.0);
        }
        assert_relative_eq!(crate::math::geometry::positional_variance(&anchors).unwrap(), 0.0);

        // Joints are still re-centred on the visible hip.
        assert!(clip.frames[5].joint(JointId::LeftKnee).is_some());
        assert!(!clip
            .warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::MissingAnchor { .. })));
    }

    #[test]
    fn test_one_sided_anchor_is_tracked() {
        let frames: Vec<Frame> = (0..4)
            .map(|i| {
                let mut frame = standing_frame(i, 0.0);
                frame.keypoints.retain(|k| k.joint != JointId::LeftHip);
                frame
            })
            .collect();
        let clip =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap();
        let anchor = clip.frames[2].anchor.unwrap();
        assert_relative_eq!(anchor.x * clip.body_scale, 110.0, epsilon = 1e-9);
    }

    #[test]
    fn test_undefined_body_scale() {
        let frames: Vec<Frame> = (0..5)
            .map(|i| {
                let mut frame = standing_frame(i, 0.0);
                frame
                    .keypoints
                    .retain(|k| !matches!(k.joint, JointId::LeftShoulder | JointId::RightShoulder));
                frame
            })
            .collect();
        let err =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap_err();
        assert_eq!(err, MetricsError::UndefinedBodyScale { total_frames: 5 });
    }

    #[test]
    fn test_rejects_bad_timestamps() {
        let frames = vec![standing_frame(1, 0.0), standing_frame(0, 0.0)];
        let err =
            normalize_frames(&frames, &SkeletonTopology::coco(), &NormalizerConfig::default())
                .unwrap_err();
        assert_eq!(err, MetricsError::NonMonotonicTimestamps { index: 1 });

        assert!(normalize_frames(&[], &SkeletonTopology::coco(), &NormalizerConfig::default())
            .is_err());
    }
}
