//! Anchor sway.
//!
//! `anchor_sway` is the positional variance of the anchor (hip centre) during
//! the hold window of each segment, in body lengths squared.

use crate::math::geometry::positional_variance;
use crate::series::anchor_track;

use super::{
    missing_fraction, CalculationContext, Metric, MetricCalculator, MetricClass, MetricOmission,
    MetricRecord, MetricUnit,
};

const ANCHOR_SWAY: &str = "anchor_sway";

#[derive(Debug, Clone, Copy, Default)]
pub struct StabilityCalculator;

impl MetricCalculator for StabilityCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Stability
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let track = anchor_track(ctx.clip);

        ctx.segments
            .iter()
            .map(|segment| {
                let window = ctx.hold_window(segment);
                let width = window.clone().count();
                let points: Vec<_> = window.filter_map(|i| track.get(i).copied().flatten()).collect();
                let missing = missing_fraction(width, points.len());

                let sway = if missing > ctx.config.max_missing_fraction {
                    None
                } else {
                    positional_variance(&points)
                };
                match sway {
                    Some(sway) => MetricRecord::Computed(Metric::per_segment(
                        ANCHOR_SWAY,
                        MetricUnit::BodyLengthsSquared,
                        segment.index,
                        sway,
                    )),
                    None => MetricRecord::Omitted(MetricOmission {
                        metric: ANCHOR_SWAY.to_string(),
                        unit: MetricUnit::BodyLengthsSquared,
                        segment_index: segment.index,
                        missing_fraction: missing,
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::math::Point;
    use crate::metrics::test_support::{empty_clip, segment};
    use crate::skeleton::SkeletonTopology;
    use approx::assert_relative_eq;

    #[test]
    fn test_sway_in_hold_window() {
        let mut clip = empty_clip(10);
        for (i, frame) in clip.frames.iter_mut().enumerate() {
            // Large drift outside the hold window, +-0.1 inside it.
            let x = match i {
                4 => -0.1,
                5 => 0.0,
                6 => 0.1,
                _ => i as f64,
            };
            frame.anchor = Some(Point::new(x, 1.0));
        }
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 5)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        assert_eq!(ctx.hold_window(&segments[0]), 4..=6);

        let records = StabilityCalculator.compute(&ctx);
        assert_eq!(records.len(), 1);
        assert_relative_eq!(records[0].as_metric().unwrap().value, 0.02 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_anchor_omits() {
        let clip = empty_clip(10);
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 5)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = StabilityCalculator.compute(&ctx);
        assert_eq!(records[0].as_omission().unwrap().metric, ANCHOR_SWAY);
    }
}
