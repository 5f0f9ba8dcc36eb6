//! Input data model: keypoints and frames produced by the pose model.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::skeleton::JointId;

/// One detected joint position in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub joint: JointId,
    /// Horizontal image coordinate.
    pub x: f64,
    /// Vertical image coordinate, growing downward.
    pub y: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    pub frame_index: usize,
}

impl Keypoint {
    #[must_use]
    pub const fn new(joint: JointId, x: f64, y: f64, confidence: f64, frame_index: usize) -> Self {
        Self {
            joint,
            x,
            y,
            confidence,
            frame_index,
        }
    }

    /// Whether the detection can be trusted at the given confidence floor.
    #[must_use]
    pub fn is_usable(&self, confidence_floor: f64) -> bool {
        self.confidence >= confidence_floor && self.x.is_finite() && self.y.is_finite()
    }
}

/// All keypoints detected at one instant.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Capture time in seconds.
    pub timestamp: f64,
    pub keypoints: Vec<Keypoint>,
}

impl Frame {
    #[must_use]
    pub const fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            keypoints: Vec::new(),
        }
    }

    /// Builder-style keypoint insertion.
    #[must_use]
    pub fn with_keypoint(mut self, keypoint: Keypoint) -> Self {
        self.keypoints.push(keypoint);
        self
    }

    /// First keypoint recorded for `joint`.
    #[must_use]
    pub fn keypoint(&self, joint: JointId) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.joint == joint)
    }
}

/// Build frames from `(timestamp, [(joint, x, y, confidence)])` rows,
/// filling in `frame_index` from the row position.
#[must_use]
pub fn frames_from_rows<I, K>(rows: I) -> Vec<Frame>
where
    I: IntoIterator<Item = (f64, K)>,
    K: IntoIterator<Item = (JointId, f64, f64, f64)>,
{
    rows.into_iter()
        .enumerate()
        .map(|(i, (timestamp, keypoints))| Frame {
            timestamp,
            keypoints: keypoints
                .into_iter()
                .map(|(joint, x, y, confidence)| Keypoint::new(joint, x, y, confidence, i))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_usable() {
        let kp = Keypoint::new(JointId::LeftKnee, 1.0, 2.0, 0.5, 0);
        assert!(kp.is_usable(0.35));
        assert!(!kp.is_usable(0.6));

        let nan = Keypoint::new(JointId::LeftKnee, f64::NAN, 2.0, 0.9, 0);
        assert!(!nan.is_usable(0.1));
    }

    #[test]
    fn test_frame_lookup_first_wins() {
        let frame = Frame::new(0.0)
            .with_keypoint(Keypoint::new(JointId::Nose, 1.0, 1.0, 0.9, 0))
            .with_keypoint(Keypoint::new(JointId::Nose, 5.0, 5.0, 0.9, 0));
        assert_eq!(frame.keypoint(JointId::Nose).map(|k| k.x), Some(1.0));
        assert!(frame.keypoint(JointId::LeftAnkle).is_none());
    }

    #[test]
    fn test_frames_from_rows() {
        let frames = frames_from_rows(vec![
            (0.0, vec![(JointId::LeftHip, 0.0, 0.0, 1.0)]),
            (0.1, vec![(JointId::LeftHip, 0.0, 1.0, 1.0)]),
        ]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].keypoints[0].frame_index, 1);
    }
}
