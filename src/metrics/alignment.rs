//! Body alignment during the hold window: mean inclination from vertical of
//! body segments (`torso_lean`, `shin_angle`) in degrees, and mean signed
//! joint-to-line offsets (`hip_line_offset`) in body lengths, positive when
//! the joint sits below the line.

use crate::math::stats::mean;
use crate::series::{inclination_angles, line_offsets};
use crate::skeleton::JointId;

use super::{CalculationContext, MetricCalculator, MetricClass, MetricRecord, MetricUnit};

#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentCalculator;

impl MetricCalculator for AlignmentCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Alignment
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let mut records = Vec::new();
        for body_segment in ctx.skeleton.body_segments() {
            let side = body_segment.joints();
            let mirror: Vec<JointId> = side.iter().map(|j| j.mirror()).collect();
            let sides = if body_segment.mirrored {
                vec![side.as_slice(), mirror.as_slice()]
            } else {
                vec![side.as_slice()]
            };
            if !ctx.reports(&body_segment.name, &sides) {
                continue;
            }
            let series = inclination_angles(ctx.clip, body_segment);
            for segment in ctx.segments {
                records.push(ctx.reduce_window(
                    &body_segment.name,
                    MetricUnit::Degrees,
                    segment,
                    &series,
                    ctx.hold_window(segment),
                    mean,
                ));
            }
        }

        for offset in ctx.skeleton.line_offsets() {
            let side = offset.joints();
            let mirror = side.map(JointId::mirror);
            let sides = if offset.mirrored {
                vec![side.as_slice(), mirror.as_slice()]
            } else {
                vec![side.as_slice()]
            };
            if !ctx.reports(&offset.name, &sides) {
                continue;
            }
            let series = line_offsets(ctx.clip, offset);
            for segment in ctx.segments {
                records.push(ctx.reduce_window(
                    &offset.name,
                    MetricUnit::BodyLengths,
                    segment,
                    &series,
                    ctx.hold_window(segment),
                    mean,
                ));
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::math::Point;
    use crate::metrics::test_support::{empty_clip, segment};
    use crate::skeleton::{JointId, SkeletonTopology};
    use approx::assert_relative_eq;

    #[test]
    fn test_torso_lean_during_hold() {
        let mut clip = empty_clip(10);
        for (i, frame) in clip.frames.iter_mut().enumerate() {
            // Upright outside the hold window, leaning 45 degrees inside.
            let lean = if (4..=6).contains(&i) { 1.0 } else { 0.0 };
            for joint in [JointId::LeftHip, JointId::RightHip] {
                frame.joints[joint.index()] = Some(Point::new(0.0, 0.0));
            }
            for joint in [JointId::LeftShoulder, JointId::RightShoulder] {
                frame.joints[joint.index()] = Some(Point::new(lean, -1.0));
            }
        }
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 5)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = AlignmentCalculator.compute(&ctx);

        let torso = records.iter().find(|r| r.name() == "torso_lean").unwrap();
        assert_relative_eq!(torso.as_metric().unwrap().value, 45.0, epsilon = 1e-9);
        // No knees or ankles in the clip.
        let shin = records.iter().find(|r| r.name() == "shin_angle").unwrap();
        assert!(shin.as_omission().is_some());
    }

    #[test]
    fn test_hip_sag_during_hold() {
        let mut clip = empty_clip(10);
        for (i, frame) in clip.frames.iter_mut().enumerate() {
            // Straight plank, hips dropping 0.1 body lengths inside the hold.
            let sag = if (4..=6).contains(&i) { 0.1 } else { 0.0 };
            for (shoulder, hip, ankle) in [
                (JointId::LeftShoulder, JointId::LeftHip, JointId::LeftAnkle),
                (JointId::RightShoulder, JointId::RightHip, JointId::RightAnkle),
            ] {
                frame.joints[shoulder.index()] = Some(Point::new(-1.0, 0.0));
                frame.joints[hip.index()] = Some(Point::new(0.0, sag));
                frame.joints[ankle.index()] = Some(Point::new(1.5, 0.0));
            }
        }
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 5)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = AlignmentCalculator.compute(&ctx);

        let hip = records.iter().find(|r| r.name() == "hip_line_offset").unwrap();
        assert_eq!(hip.unit(), MetricUnit::BodyLengths);
        assert_relative_eq!(hip.as_metric().unwrap().value, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_profile_skips_unseen_segments() {
        use crate::reference::{DrivingSignal, ExpectedRange, ReferenceProfile};

        let clip = empty_clip(10);
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 5)];
        let profile = ReferenceProfile::new("push_up", DrivingSignal::angle("elbow_angle"))
            .with_range("hip_line_offset", ExpectedRange::around(0.0, 0.1, 0.2));
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config).with_profile(&profile);
        let records = AlignmentCalculator.compute(&ctx);

        // Ranged metrics are still reported, as omissions.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "hip_line_offset");
        assert!(records[0].as_omission().is_some());
    }
}
