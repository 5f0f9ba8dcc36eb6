//! Joint angle metrics.
//!
//! For every articulation the mean angle over the segment
//! (`left_knee_angle`), and for every bilateral pair the mean, minimum and
//! maximum of the side-averaged angle (`knee_angle`, `knee_angle_min`,
//! `knee_angle_max`). Angles are in degrees within [0, 180].
//!
//! Under a profile, a name is skipped when no side's joints appear in the
//! clip and the profile has no range for it.

use crate::math::stats::{mean, min_max};
use crate::series::{articulation_angles, pair_angles};
use crate::skeleton::{BilateralPair, JointId, SkeletonTopology};

use super::{CalculationContext, MetricCalculator, MetricClass, MetricRecord, MetricUnit};

#[derive(Debug, Clone, Copy, Default)]
pub struct AngleCalculator;

impl MetricCalculator for AngleCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Angle
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let mut records = Vec::new();

        for pair in ctx.skeleton.bilateral_pairs() {
            let side_joints = pair_sides(ctx.skeleton, pair);
            let sides: Vec<&[JointId]> = side_joints.iter().map(Vec::as_slice).collect();
            let name = format!("{}_angle", pair.name);
            let (min_name, max_name) = (format!("{name}_min"), format!("{name}_max"));
            let wanted = [&name, &min_name, &max_name].map(|n| ctx.reports(n, &sides));
            if !wanted.contains(&true) {
                continue;
            }

            let series = pair_angles(ctx.clip, ctx.skeleton, pair);
            if wanted[0] {
                for segment in ctx.segments {
                    records.push(ctx.reduce_window(
                        &name,
                        MetricUnit::Degrees,
                        segment,
                        &series,
                        segment.frames(),
                        mean,
                    ));
                }
            }
            if wanted[1] {
                for segment in ctx.segments {
                    records.push(ctx.reduce_window(
                        &min_name,
                        MetricUnit::Degrees,
                        segment,
                        &series,
                        segment.frames(),
                        |v| min_max(v).map(|(lo, _)| lo),
                    ));
                }
            }
            if wanted[2] {
                for segment in ctx.segments {
                    records.push(ctx.reduce_window(
                        &max_name,
                        MetricUnit::Degrees,
                        segment,
                        &series,
                        segment.frames(),
                        |v| min_max(v).map(|(_, hi)| hi),
                    ));
                }
            }
        }

        for articulation in ctx.skeleton.articulations() {
            if !ctx.reports(&articulation.name, &[articulation.joints().as_slice()]) {
                continue;
            }
            let series = articulation_angles(ctx.clip, articulation);
            for segment in ctx.segments {
                records.push(ctx.reduce_window(
                    &articulation.name,
                    MetricUnit::Degrees,
                    segment,
                    &series,
                    segment.frames(),
                    mean,
                ));
            }
        }

        records
    }
}

/// Joints of each side of `pair` that the skeleton defines.
fn pair_sides(skeleton: &SkeletonTopology, pair: &BilateralPair) -> Vec<Vec<JointId>> {
    [&pair.left, &pair.right]
        .into_iter()
        .filter_map(|name| skeleton.articulation(name))
        .map(|articulation| articulation.joints().to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::math::Point;
    use crate::metrics::test_support::{empty_clip, segment};
    use crate::skeleton::{JointId, SkeletonTopology};
    use approx::assert_relative_eq;

    /// Right knee only, bending from straight to 90 degrees and back.
    fn knee_clip() -> crate::normalizer::NormalizedClip {
        let mut clip = empty_clip(5);
        for (frame, deg) in clip.frames.iter_mut().zip([180.0_f64, 135.0, 90.0, 135.0, 180.0]) {
            let rad = (180.0 - deg).to_radians();
            frame.joints[JointId::RightHip.index()] = Some(Point::new(0.0, -1.0));
            frame.joints[JointId::RightKnee.index()] = Some(Point::new(0.0, 0.0));
            frame.joints[JointId::RightAnkle.index()] = Some(Point::new(rad.sin(), rad.cos()));
        }
        clip
    }

    fn find<'a>(records: &'a [MetricRecord], name: &str) -> &'a MetricRecord {
        records.iter().find(|r| r.name() == name).unwrap()
    }

    #[test]
    fn test_pair_extremes() {
        let clip = knee_clip();
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 4, 2)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = AngleCalculator.compute(&ctx);

        let value = |name| find(&records, name).as_metric().unwrap().value;
        assert_relative_eq!(value("knee_angle"), 144.0, epsilon = 1e-9);
        assert_relative_eq!(value("knee_angle_min"), 90.0, epsilon = 1e-9);
        assert_relative_eq!(value("knee_angle_max"), 180.0, epsilon = 1e-9);
        assert_relative_eq!(value("right_knee_angle"), 144.0, epsilon = 1e-9);
        assert!(find(&records, "left_knee_angle").as_omission().is_some());
    }

    #[test]
    fn test_one_record_per_segment() {
        let clip = knee_clip();
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 1, 0), segment(1, 2, 4, 2)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = AngleCalculator.compute(&ctx);

        let names = skeleton.bilateral_pairs().len() * 3 + skeleton.articulations().len();
        assert_eq!(records.len(), names * segments.len());
        for record in records.iter().filter(|r| r.name() == "knee_angle") {
            assert!(record.as_metric().is_some());
        }
    }

    #[test]
    fn test_profile_skips_unseen_articulations() {
        use crate::reference::{DrivingSignal, ReferenceProfile};

        let clip = knee_clip();
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 4, 2)];
        let profile = ReferenceProfile::new("squat", DrivingSignal::angle("knee_angle"));
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config).with_profile(&profile);
        let records = AngleCalculator.compute(&ctx);

        let names: Vec<&str> = records.iter().map(MetricRecord::name).collect();
        assert_eq!(
            names,
            ["knee_angle", "knee_angle_min", "knee_angle_max", "right_knee_angle"]
        );
        assert!(records.iter().all(|r| r.as_metric().is_some()));
    }
}
