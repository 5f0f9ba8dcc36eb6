//! Skeleton topology: joints, bones and the named angles built from them.
//!
//! The topology is static data. It tells the calculators which three joints
//! define an articulation angle, which articulations mirror each other for
//! symmetry, which two-joint body segments are measured against vertical,
//! which spacings and line offsets are tracked, and which joints anchor and
//! scale the normalized coordinate frame.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Body side of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Side {
    Left,
    Right,
    Center,
}

/// The 17 COCO body keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JointId {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointId {
    /// All joints in COCO index order.
    pub const ALL: [Self; 17] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// COCO keypoint index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look a joint up by its COCO index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name, matching the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Body side of the joint.
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Nose => Side::Center,
            Self::LeftEye
            | Self::LeftEar
            | Self::LeftShoulder
            | Self::LeftElbow
            | Self::LeftWrist
            | Self::LeftHip
            | Self::LeftKnee
            | Self::LeftAnkle => Side::Left,
            _ => Side::Right,
        }
    }

    /// The same joint on the opposite side (center joints map to themselves).
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Nose => Self::Nose,
            Self::LeftEye => Self::RightEye,
            Self::RightEye => Self::LeftEye,
            Self::LeftEar => Self::RightEar,
            Self::RightEar => Self::LeftEar,
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftWrist => Self::RightWrist,
            Self::RightWrist => Self::LeftWrist,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftAnkle => Self::RightAnkle,
            Self::RightAnkle => Self::LeftAnkle,
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An angle defined by three joints, measured at `vertex`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Articulation {
    /// Metric name, e.g. `left_knee_angle`.
    pub name: String,
    pub proximal: JointId,
    pub vertex: JointId,
    pub distal: JointId,
}

impl Articulation {
    #[must_use]
    pub fn new(name: impl Into<String>, proximal: JointId, vertex: JointId, distal: JointId) -> Self {
        Self {
            name: name.into(),
            proximal,
            vertex,
            distal,
        }
    }

    /// The three joints in `[proximal, vertex, distal]` order.
    #[must_use]
    pub const fn joints(&self) -> [JointId; 3] {
        [self.proximal, self.vertex, self.distal]
    }

    /// Whether the angle depends on `joint`.
    #[must_use]
    pub fn involves(&self, joint: JointId) -> bool {
        self.joints().contains(&joint)
    }
}

/// A pair of mirrored articulations compared for symmetry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BilateralPair {
    /// Base name, e.g. `knee`. Metrics are named `knee_angle`, `knee_symmetry`.
    pub name: String,
    /// Name of the left-side articulation.
    pub left: String,
    /// Name of the right-side articulation.
    pub right: String,
}

/// One end of a body segment: a single joint, or the midpoint of a joint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SegmentEnd {
    Joint(JointId),
    Midpoint(JointId, JointId),
}

impl SegmentEnd {
    fn joints(self) -> Vec<JointId> {
        match self {
            Self::Joint(j) => vec![j],
            Self::Midpoint(a, b) => vec![a, b],
        }
    }
}

/// A two-ended body segment whose inclination from vertical is measured.
///
/// When `mirrored` is set, the segment is evaluated on both sides (using
/// [`JointId::mirror`] on every joint) and the two inclinations are averaged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodySegment {
    /// Metric name, e.g. `torso_lean`.
    pub name: String,
    pub upper: SegmentEnd,
    pub lower: SegmentEnd,
    pub mirrored: bool,
}

impl BodySegment {
    /// Joints required on one side.
    #[must_use]
    pub fn joints(&self) -> Vec<JointId> {
        let mut joints = self.upper.joints();
        joints.extend(self.lower.joints());
        joints
    }
}

/// Ratio of the horizontal spacing of two joint pairs, such as knee width
/// over ankle width.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpacingRatio {
    /// Metric name, e.g. `knee_valgus_ratio`.
    pub name: String,
    pub numerator: (JointId, JointId),
    pub denominator: (JointId, JointId),
}

impl SpacingRatio {
    #[must_use]
    pub const fn joints(&self) -> [JointId; 4] {
        [
            self.numerator.0,
            self.numerator.1,
            self.denominator.0,
            self.denominator.1,
        ]
    }
}

/// Signed offset of a joint from the line through two others, e.g. the hip
/// against the shoulder-ankle line of a plank.
///
/// Mirrored offsets are measured on both sides and averaged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineOffset {
    /// Metric name, e.g. `hip_line_offset`.
    pub name: String,
    pub point: JointId,
    pub line_start: JointId,
    pub line_end: JointId,
    pub mirrored: bool,
}

impl LineOffset {
    /// Joints required on one side: `[point, line_start, line_end]`.
    #[must_use]
    pub const fn joints(&self) -> [JointId; 3] {
        [self.point, self.line_start, self.line_end]
    }
}

/// Static body graph plus the named measurements defined on it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkeletonTopology {
    bones: Vec<(JointId, JointId)>,
    articulations: Vec<Articulation>,
    bilateral_pairs: Vec<BilateralPair>,
    body_segments: Vec<BodySegment>,
    #[cfg_attr(feature = "serde", serde(default))]
    spacing_ratios: Vec<SpacingRatio>,
    #[cfg_attr(feature = "serde", serde(default))]
    line_offsets: Vec<LineOffset>,
    anchor: (JointId, JointId),
    scale_reference: (JointId, JointId),
}

impl SkeletonTopology {
    /// Create an empty topology anchored on the hips and scaled by the torso.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            articulations: Vec::new(),
            bilateral_pairs: Vec::new(),
            body_segments: Vec::new(),
            spacing_ratios: Vec::new(),
            line_offsets: Vec::new(),
            anchor: (JointId::LeftHip, JointId::RightHip),
            scale_reference: (JointId::LeftShoulder, JointId::RightShoulder),
        }
    }

    /// The COCO-17 body graph with limb angles, symmetry pairs and the
    /// torso/shin inclination segments.
    #[must_use]
    pub fn coco() -> Self {
        use JointId::*;

        let mut topology = Self::new();
        for (a, b) in [
            (Nose, LeftEye),
            (Nose, RightEye),
            (LeftEye, LeftEar),
            (RightEye, RightEar),
            (LeftShoulder, RightShoulder),
            (LeftShoulder, LeftElbow),
            (LeftElbow, LeftWrist),
            (RightShoulder, RightElbow),
            (RightElbow, RightWrist),
            (LeftShoulder, LeftHip),
            (RightShoulder, RightHip),
            (LeftHip, RightHip),
            (LeftHip, LeftKnee),
            (LeftKnee, LeftAnkle),
            (RightHip, RightKnee),
            (RightKnee, RightAnkle),
        ] {
            topology.bones.push((a, b));
        }

        topology = topology
            .with_bilateral_articulation("elbow", LeftShoulder, LeftElbow, LeftWrist)
            .with_bilateral_articulation("shoulder", LeftHip, LeftShoulder, LeftElbow)
            .with_bilateral_articulation("hip", LeftShoulder, LeftHip, LeftKnee)
            .with_bilateral_articulation("knee", LeftHip, LeftKnee, LeftAnkle);

        topology.body_segments.push(BodySegment {
            name: "torso_lean".into(),
            upper: SegmentEnd::Midpoint(LeftShoulder, RightShoulder),
            lower: SegmentEnd::Midpoint(LeftHip, RightHip),
            mirrored: false,
        });
        topology.body_segments.push(BodySegment {
            name: "shin_angle".into(),
            upper: SegmentEnd::Joint(LeftKnee),
            lower: SegmentEnd::Joint(LeftAnkle),
            mirrored: true,
        });

        topology.spacing_ratios.push(SpacingRatio {
            name: "knee_valgus_ratio".into(),
            numerator: (LeftKnee, RightKnee),
            denominator: (LeftAnkle, RightAnkle),
        });
        topology.line_offsets.push(LineOffset {
            name: "hip_line_offset".into(),
            point: LeftHip,
            line_start: LeftShoulder,
            line_end: LeftAnkle,
            mirrored: true,
        });

        topology
    }

    /// Add a left-side articulation, its mirrored right-side twin and the
    /// symmetry pair linking them. Names follow `left_<base>_angle`.
    #[must_use]
    pub fn with_bilateral_articulation(
        mut self,
        base: &str,
        proximal: JointId,
        vertex: JointId,
        distal: JointId,
    ) -> Self {
        let left = Articulation::new(format!("left_{base}_angle"), proximal, vertex, distal);
        let right = Articulation::new(
            format!("right_{base}_angle"),
            proximal.mirror(),
            vertex.mirror(),
            distal.mirror(),
        );
        self.bilateral_pairs.push(BilateralPair {
            name: base.to_string(),
            left: left.name.clone(),
            right: right.name.clone(),
        });
        self.articulations.push(left);
        self.articulations.push(right);
        self
    }

    /// Add a standalone articulation.
    #[must_use]
    pub fn with_articulation(mut self, articulation: Articulation) -> Self {
        self.articulations.push(articulation);
        self
    }

    /// Add a body segment measured against vertical.
    #[must_use]
    pub fn with_body_segment(mut self, segment: BodySegment) -> Self {
        self.body_segments.push(segment);
        self
    }

    /// Add a horizontal spacing ratio.
    #[must_use]
    pub fn with_spacing_ratio(mut self, ratio: SpacingRatio) -> Self {
        self.spacing_ratios.push(ratio);
        self
    }

    /// Add a joint-to-line offset.
    #[must_use]
    pub fn with_line_offset(mut self, offset: LineOffset) -> Self {
        self.line_offsets.push(offset);
        self
    }

    /// Add a bone to the joint graph.
    #[must_use]
    pub fn with_bone(mut self, a: JointId, b: JointId) -> Self {
        self.bones.push((a, b));
        self
    }

    /// Bones of the joint graph.
    #[must_use]
    pub fn bones(&self) -> &[(JointId, JointId)] {
        &self.bones
    }

    /// Adjacency view: each joint with the joints it connects to.
    #[must_use]
    pub fn adjacency(&self) -> BTreeMap<JointId, Vec<JointId>> {
        let mut adjacency: BTreeMap<JointId, Vec<JointId>> = BTreeMap::new();
        for &(a, b) in &self.bones {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
        adjacency
    }

    /// Joints directly connected to `joint`.
    #[must_use]
    pub fn neighbors(&self, joint: JointId) -> Vec<JointId> {
        self.bones
            .iter()
            .filter_map(|&(a, b)| {
                if a == joint {
                    Some(b)
                } else if b == joint {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn articulations(&self) -> &[Articulation] {
        &self.articulations
    }

    #[must_use]
    pub fn articulation(&self, name: &str) -> Option<&Articulation> {
        self.articulations.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn bilateral_pairs(&self) -> &[BilateralPair] {
        &self.bilateral_pairs
    }

    /// Find a bilateral pair by its base name (`knee`) or by its combined
    /// angle metric name (`knee_angle`).
    #[must_use]
    pub fn bilateral_pair(&self, name: &str) -> Option<&BilateralPair> {
        let base = name.strip_suffix("_angle").unwrap_or(name);
        self.bilateral_pairs.iter().find(|p| p.name == base)
    }

    #[must_use]
    pub fn body_segments(&self) -> &[BodySegment] {
        &self.body_segments
    }

    #[must_use]
    pub fn spacing_ratios(&self) -> &[SpacingRatio] {
        &self.spacing_ratios
    }

    #[must_use]
    pub fn line_offsets(&self) -> &[LineOffset] {
        &self.line_offsets
    }

    /// Joints whose midpoint is the coordinate origin.
    #[must_use]
    pub const fn anchor(&self) -> (JointId, JointId) {
        self.anchor
    }

    /// Joints whose midpoint, together with the anchor, defines body size.
    #[must_use]
    pub const fn scale_reference(&self) -> (JointId, JointId) {
        self.scale_reference
    }

    /// Override anchor and scale reference joints.
    #[must_use]
    pub const fn with_reference_joints(
        mut self,
        anchor: (JointId, JointId),
        scale_reference: (JointId, JointId),
    ) -> Self {
        self.anchor = anchor;
        self.scale_reference = scale_reference;
        self
    }

    /// Check that every named measurement refers to existing articulations
    /// and that names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::InvalidConfig`] on dangling or duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for articulation in &self.articulations {
            if !seen.insert(articulation.name.as_str()) {
                return Err(MetricsError::invalid_config(format!(
                    "duplicate articulation name '{}'",
                    articulation.name
                )));
            }
        }
        for pair in &self.bilateral_pairs {
            for side in [&pair.left, &pair.right] {
                if self.articulation(side).is_none() {
                    return Err(MetricsError::invalid_config(format!(
                        "bilateral pair '{}' refers to unknown articulation '{side}'",
                        pair.name
                    )));
                }
            }
        }
        if self.anchor.0 == self.scale_reference.0 && self.anchor.1 == self.scale_reference.1 {
            return Err(MetricsError::invalid_config(
                "anchor and scale reference joints must differ",
            ));
        }
        Ok(())
    }
}

impl Default for SkeletonTopology {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_index_round_trip() {
        for (i, joint) in JointId::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(JointId::from_index(i), Some(*joint));
        }
        assert_eq!(JointId::from_index(17), None);
    }

    #[test]
    fn test_mirror_is_involution() {
        for joint in JointId::ALL {
            assert_eq!(joint.mirror().mirror(), joint);
            if joint.side() == Side::Left {
                assert_eq!(joint.mirror().side(), Side::Right);
            }
        }
    }

    #[test]
    fn test_coco_articulations() {
        let skeleton = SkeletonTopology::coco();
        assert!(skeleton.validate().is_ok());

        let knee = skeleton.articulation("left_knee_angle").unwrap();
        assert_eq!(
            knee.joints(),
            [JointId::LeftHip, JointId::LeftKnee, JointId::LeftAnkle]
        );
        let right = skeleton.articulation("right_knee_angle").unwrap();
        assert_eq!(right.vertex, JointId::RightKnee);

        assert_eq!(skeleton.bilateral_pairs().len(), 4);
        assert!(skeleton.bilateral_pair("knee_angle").is_some());
        assert!(skeleton.bilateral_pair("elbow").is_some());
        assert!(skeleton.bilateral_pair("wrist").is_none());

        let valgus = &skeleton.spacing_ratios()[0];
        assert_eq!(valgus.name, "knee_valgus_ratio");
        assert_eq!(valgus.joints()[2], JointId::LeftAnkle);
        let offset = &skeleton.line_offsets()[0];
        assert_eq!(offset.joints(), [JointId::LeftHip, JointId::LeftShoulder, JointId::LeftAnkle]);
    }

    #[test]
    fn test_neighbors() {
        let skeleton = SkeletonTopology::coco();
        let mut knee = skeleton.neighbors(JointId::LeftKnee);
        knee.sort();
        assert_eq!(knee, vec![JointId::LeftHip, JointId::LeftAnkle]);

        let adjacency = skeleton.adjacency();
        assert_eq!(adjacency[&JointId::LeftShoulder].len(), 3);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let skeleton = SkeletonTopology::coco().with_articulation(Articulation::new(
            "left_knee_angle",
            JointId::LeftHip,
            JointId::LeftKnee,
            JointId::LeftAnkle,
        ));
        assert!(skeleton.validate().is_err());
    }
}
