//! Bilateral symmetry.
//!
//! `{pair}_symmetry` is the mean left angle divided by the mean right angle
//! over the frames of a segment where both sides are valid. 1.0 is perfect
//! symmetry; values are non-negative.
//!
//! Under a profile, pairs whose two sides are never both seen are skipped
//! unless the profile ranges the metric.

use crate::math::stats::mean;
use crate::series::pair_side_angles;
use crate::skeleton::JointId;

use super::{
    missing_fraction, CalculationContext, Metric, MetricCalculator, MetricClass, MetricOmission,
    MetricRecord, MetricUnit,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetryCalculator;

impl MetricCalculator for SymmetryCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Symmetry
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let mut records = Vec::new();

        for pair in ctx.skeleton.bilateral_pairs() {
            let name = format!("{}_symmetry", pair.name);
            let both_sides: Vec<JointId> = [&pair.left, &pair.right]
                .into_iter()
                .filter_map(|side| ctx.skeleton.articulation(side))
                .flat_map(|articulation| articulation.joints())
                .collect();
            if !ctx.reports(&name, &[both_sides.as_slice()]) {
                continue;
            }
            let (left, right) = pair_side_angles(ctx.clip, ctx.skeleton, pair);

            for segment in ctx.segments {
                let both: Vec<(f64, f64)> = segment
                    .frames()
                    .filter_map(|i| Some((left.get(i).copied()??, right.get(i).copied()??)))
                    .collect();
                let missing = missing_fraction(segment.frame_count(), both.len());

                let ratio = if missing > ctx.config.max_missing_fraction {
                    None
                } else {
                    let l: Vec<f64> = both.iter().map(|&(l, _)| l).collect();
                    let r: Vec<f64> = both.iter().map(|&(_, r)| r).collect();
                    match (mean(&l), mean(&r)) {
                        (Some(l), Some(r)) if r > ctx.config.numerical_eps => Some(l / r),
                        _ => None,
                    }
                };

                records.push(match ratio {
                    Some(ratio) => MetricRecord::Computed(Metric::per_segment(
                        name.as_str(),
                        MetricUnit::Ratio,
                        segment.index,
                        ratio,
                    )),
                    None => MetricRecord::Omitted(MetricOmission {
                        metric: name.clone(),
                        unit: MetricUnit::Ratio,
                        segment_index: segment.index,
                        missing_fraction: missing,
                    }),
                });
            }
        }

        records
    }
}
