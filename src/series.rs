//! Per-frame signal extraction from a normalized clip.
//!
//! Every series has one entry per frame; `None` marks frames where the
//! required joints are missing or the measurement is undefined.

use crate::error::{MetricsError, Result};
use crate::math::geometry::{
    angle_at_vertex, horizontal_spacing, inclination_from_vertical, offset_from_line, pair_center,
    Point,
};
use crate::normalizer::{NormalizedClip, NormalizedFrame};
use crate::reference::DrivingSignal;
use crate::skeleton::{
    Articulation, BilateralPair, BodySegment, JointId, LineOffset, SegmentEnd, SkeletonTopology,
    SpacingRatio,
};

/// A per-frame measurement.
pub type Series = Vec<Option<f64>>;

/// Angle of one articulation in every frame.
#[must_use]
pub fn articulation_angles(clip: &NormalizedClip, articulation: &Articulation) -> Series {
    clip.frames
        .iter()
        .map(|frame| {
            let [a, b, c] = frame.all(articulation.joints())?;
            angle_at_vertex(&a, &b, &c)
        })
        .collect()
}

/// Left and right angle series of a bilateral pair.
///
/// Sides whose articulation is absent from the skeleton yield all-`None`.
#[must_use]
pub fn pair_side_angles(
    clip: &NormalizedClip,
    skeleton: &SkeletonTopology,
    pair: &BilateralPair,
) -> (Series, Series) {
    let side = |name: &str| match skeleton.articulation(name) {
        Some(articulation) => articulation_angles(clip, articulation),
        None => vec![None; clip.len()],
    };
    (side(&pair.left), side(&pair.right))
}

/// Side-averaged angle of a bilateral pair: the mean of both sides where
/// both are valid, otherwise whichever side is valid.
#[must_use]
pub fn pair_angles(clip: &NormalizedClip, skeleton: &SkeletonTopology, pair: &BilateralPair) -> Series {
    let (left, right) = pair_side_angles(clip, skeleton, pair);
    left.into_iter()
        .zip(right)
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (l, r) => l.or(r),
        })
        .collect()
}

fn segment_end(frame: &NormalizedFrame, end: SegmentEnd, mirrored: bool) -> Option<Point> {
    let pick = |joint: JointId| {
        frame.joint(if mirrored { joint.mirror() } else { joint })
    };
    match end {
        SegmentEnd::Joint(j) => pick(j),
        SegmentEnd::Midpoint(a, b) => pair_center(pick(a), pick(b)),
    }
}

/// Inclination from vertical of a body segment (lower end to upper end).
///
/// Mirrored segments are averaged over the sides that are visible.
#[must_use]
pub fn inclination_angles(clip: &NormalizedClip, segment: &BodySegment) -> Series {
    clip.frames
        .iter()
        .map(|frame| {
            let side = |mirrored: bool| {
                let upper = segment_end(frame, segment.upper, mirrored)?;
                let lower = segment_end(frame, segment.lower, mirrored)?;
                inclination_from_vertical(&lower, &upper)
            };
            if segment.mirrored {
                match (side(false), side(true)) {
                    (Some(a), Some(b)) => Some((a + b) / 2.0),
                    (a, b) => a.or(b),
                }
            } else {
                side(false)
            }
        })
        .collect()
}

/// Horizontal spacing ratio in every frame; missing where the denominator
/// spacing is at most `eps`.
#[must_use]
pub fn spacing_ratios(clip: &NormalizedClip, ratio: &SpacingRatio, eps: f64) -> Series {
    clip.frames
        .iter()
        .map(|frame| {
            let [a, b, c, d] = frame.all(ratio.joints())?;
            let denominator = horizontal_spacing(&c, &d);
            (denominator > eps).then(|| horizontal_spacing(&a, &b) / denominator)
        })
        .collect()
}

/// Signed joint-to-line offset in body lengths, positive below the line.
///
/// Mirrored offsets are averaged over the sides that are visible.
#[must_use]
pub fn line_offsets(clip: &NormalizedClip, offset: &LineOffset) -> Series {
    clip.frames
        .iter()
        .map(|frame| {
            let side = |joints: [JointId; 3]| {
                let [p, a, b] = frame.all(joints)?;
                offset_from_line(&p, &a, &b)
            };
            let left = side(offset.joints());
            if offset.mirrored {
                match (left, side(offset.joints().map(JointId::mirror))) {
                    (Some(a), Some(b)) => Some((a + b) / 2.0),
                    (a, b) => a.or(b),
                }
            } else {
                left
            }
        })
        .collect()
}

/// Anchor track (body-length units) in every frame.
#[must_use]
pub fn anchor_track(clip: &NormalizedClip) -> Vec<Option<Point>> {
    clip.frames.iter().map(|f| f.anchor).collect()
}

/// The series followed by the segment detector.
///
/// # Errors
///
/// Returns [`MetricsError::InvalidProfile`] when an articulation signal names
/// neither an articulation nor a bilateral pair of `skeleton`.
pub fn driving_series(
    clip: &NormalizedClip,
    skeleton: &SkeletonTopology,
    signal: &DrivingSignal,
) -> Result<Series> {
    match signal {
        DrivingSignal::Articulation(name) => {
            if let Some(articulation) = skeleton.articulation(name) {
                Ok(articulation_angles(clip, articulation))
            } else if let Some(pair) = skeleton.bilateral_pair(name) {
                Ok(pair_angles(clip, skeleton, pair))
            } else {
                Err(MetricsError::invalid_profile(format!(
                    "driving signal '{name}' is not defined by the skeleton"
                )))
            }
        }
        DrivingSignal::AnchorVertical => Ok(clip
            .frames
            .iter()
            .map(|f| f.anchor.map(|a| a.y))
            .collect()),
    }
}
