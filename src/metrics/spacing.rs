//! Horizontal spacing ratios during the hold window, e.g. `knee_valgus_ratio`
//! (knee width over ankle width). Below 1 the knees cave inward.

use crate::math::stats::mean;
use crate::series::spacing_ratios;

use super::{CalculationContext, MetricCalculator, MetricClass, MetricRecord, MetricUnit};

#[derive(Debug, Clone, Copy, Default)]
pub struct SpacingCalculator;

impl MetricCalculator for SpacingCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Spacing
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let mut records = Vec::new();
        for ratio in ctx.skeleton.spacing_ratios() {
            if !ctx.reports(&ratio.name, &[ratio.joints().as_slice()]) {
                continue;
            }
            let series = spacing_ratios(ctx.clip, ratio, ctx.config.numerical_eps);
            for segment in ctx.segments {
                records.push(ctx.reduce_window(
                    &ratio.name,
                    MetricUnit::Ratio,
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
