//! Repetition timing.
//!
//! Per segment: `rep_duration`, `descent_duration` (start to peak) and
//! `ascent_duration` (peak to end), in seconds. Across the clip:
//! `rep_duration_variance`, the population variance of the durations of the
//! complete segments.

use crate::math::stats::population_variance;

use super::{CalculationContext, Metric, MetricCalculator, MetricClass, MetricRecord, MetricUnit};

#[derive(Debug, Clone, Copy, Default)]
pub struct TempoCalculator;

impl MetricCalculator for TempoCalculator {
    fn class(&self) -> MetricClass {
        MetricClass::Tempo
    }

    fn compute(&self, ctx: &CalculationContext<'_>) -> Vec<MetricRecord> {
        let t = &ctx.clip.timestamps;
        let phases: Vec<(usize, [f64; 3])> = ctx
            .segments
            .iter()
            .map(|s| {
                let (start, peak, end) = (t[s.start_frame], t[s.peak_frame], t[s.end_frame]);
                (s.index, [end - start, peak - start, end - peak])
            })
            .collect();

        let mut records = Vec::with_capacity(phases.len() * 3 + 1);
        for (slot, name) in ["rep_duration", "descent_duration", "ascent_duration"]
            .into_iter()
            .enumerate()
        {
            records.extend(phases.iter().map(|(index, values)| {
                MetricRecord::Computed(Metric::per_segment(name, MetricUnit::Seconds, *index, values[slot]))
            }));
        }

        let complete: Vec<f64> = ctx
            .segments
            .iter()
            .zip(&phases)
            .filter(|(segment, _)| segment.is_complete())
            .map(|(_, (_, values))| values[0])
            .collect();
        if let Some(variance) = population_variance(&complete) {
            records.push(MetricRecord::Computed(Metric::aggregate(
                "rep_duration_variance",
                MetricUnit::SecondsSquared,
                variance,
            )));
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::metrics::test_support::{empty_clip, segment};
    use crate::metrics::MetricScope;
    use crate::segmentation::SegmentStatus;
    use crate::skeleton::SkeletonTopology;
    use approx::assert_relative_eq;

    fn values(records: &[MetricRecord], name: &str) -> Vec<f64> {
        records
            .iter()
            .filter(|r| r.name() == name)
            .filter_map(|r| r.as_metric().map(|m| m.value))
            .collect()
    }

    #[test]
    fn test_phase_durations() {
        let clip = empty_clip(30);
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let segments = [segment(0, 0, 9, 4), segment(1, 10, 29, 20)];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = TempoCalculator.compute(&ctx);

        let rep = values(&records, "rep_duration");
        assert_relative_eq!(rep[0], 0.9, epsilon = 1e-9);
        assert_relative_eq!(rep[1], 1.9, epsilon = 1e-9);
        assert_relative_eq!(values(&records, "descent_duration")[0], 0.4, epsilon = 1e-9);
        assert_relative_eq!(values(&records, "ascent_duration")[1], 0.9, epsilon = 1e-9);

        let variance = records.last().unwrap().as_metric().unwrap();
        assert_eq!(variance.name, "rep_duration_variance");
        assert_eq!(variance.scope, MetricScope::Aggregate);
        assert_eq!(variance.segment_index, None);
        assert_relative_eq!(variance.value, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_variance_ignores_incomplete() {
        let clip = empty_clip(30);
        let skeleton = SkeletonTopology::coco();
        let config = MetricConfig::default();
        let mut trailing = segment(1, 10, 29, 20);
        trailing.status = SegmentStatus::Incomplete;
        let segments = [segment(0, 0, 9, 4), trailing];
        let ctx = CalculationContext::new(&clip, &segments, &skeleton, &config);
        let records = TempoCalculator.compute(&ctx);

        assert_eq!(values(&records, "rep_duration").len(), 2);
        assert_relative_eq!(values(&records, "rep_duration_variance")[0], 0.0);
    }
}
