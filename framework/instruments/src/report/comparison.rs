use std::collections::HashMap;
use std::time::Duration;

use carrier_bench_summary_model::{
    ScenarioSummary, BOUNDED_POOL_ENGINE, CARRIER_BLOCKING_PRIMITIVE, COOPERATIVE_PRIMITIVE,
    LIGHTWEIGHT_ENGINE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    /// Bounded pool against lightweight units on the same workload.
    EngineSpeedup,
    /// Carrier-blocking lock against cooperative lock on the same hazard workload.
    PinningSlowdown,
}

/// How much longer the baseline took than the contender on the same workload.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub kind: ComparisonKind,
    pub task_count: u64,
    pub delay: Duration,
    pub baseline: String,
    pub contender: String,
    /// `baseline.elapsed / contender.elapsed`
    pub factor: f64,
    /// Set when the baseline did not complete, so the real factor is at least [Comparison::factor].
    pub lower_bound: bool,
}

/// Pair up scenarios that ran the same workload and compute their speedup factors.
///
/// Engine speedups compare [BOUNDED_POOL_ENGINE] to [LIGHTWEIGHT_ENGINE]. Pinning comparisons
/// compare [CARRIER_BLOCKING_PRIMITIVE] to [COOPERATIVE_PRIMITIVE].
pub fn compare(summaries: &[ScenarioSummary]) -> Vec<Comparison> {
    let by_workload = summaries.iter().fold(
        HashMap::<(u64, Duration, bool), Vec<&ScenarioSummary>>::new(),
        |mut acc, summary| {
            let configuration = &summary.configuration;
            acc.entry((
                configuration.task_count,
                configuration.delay,
                configuration.primitive.is_some(),
            ))
            .or_default()
            .push(summary);
            acc
        },
    );

    let mut comparisons = by_workload
        .into_iter()
        .filter_map(|((task_count, delay, is_hazard), group)| {
            let (kind, baseline, contender) = if is_hazard {
                (
                    ComparisonKind::PinningSlowdown,
                    find_primitive(&group, CARRIER_BLOCKING_PRIMITIVE)?,
                    find_primitive(&group, COOPERATIVE_PRIMITIVE)?,
                )
            } else {
                (
                    ComparisonKind::EngineSpeedup,
                    find_engine(&group, BOUNDED_POOL_ENGINE)?,
                    find_engine(&group, LIGHTWEIGHT_ENGINE)?,
                )
            };

            let factor = contender.metrics.speedup_over(&baseline.metrics)?;
            Some(Comparison {
                kind,
                task_count,
                delay,
                baseline: baseline.scenario_name.clone(),
                contender: contender.scenario_name.clone(),
                factor,
                lower_bound: !baseline.metrics.is_complete(),
            })
        })
        .collect::<Vec<_>>();

    comparisons.sort_by_key(|c| (c.task_count, c.delay));
    comparisons
}

fn find_engine<'a>(group: &[&'a ScenarioSummary], engine: &str) -> Option<&'a ScenarioSummary> {
    group
        .iter()
        .find(|s| s.configuration.engine == engine)
        .copied()
}

fn find_primitive<'a>(
    group: &[&'a ScenarioSummary],
    primitive: &str,
) -> Option<&'a ScenarioSummary> {
    group
        .iter()
        .find(|s| s.configuration.primitive.as_deref() == Some(primitive))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::summary;
    use carrier_bench_summary_model::{Completion, UNLOCKED_PRIMITIVE};

    #[test]
    fn engine_speedup_per_task_count() {
        let summaries = vec![
            summary(
                BOUNDED_POOL_ENGINE,
                None,
                100,
                Duration::from_millis(400),
                Completion::Complete,
            ),
            summary(
                LIGHTWEIGHT_ENGINE,
                None,
                100,
                Duration::from_millis(20),
                Completion::Complete,
            ),
            summary(
                BOUNDED_POOL_ENGINE,
                None,
                1000,
                Duration::from_secs(4),
                Completion::TimedOut,
            ),
            summary(
                LIGHTWEIGHT_ENGINE,
                None,
                1000,
                Duration::from_millis(40),
                Completion::Complete,
            ),
        ];

        let comparisons = compare(&summaries);
        assert_eq!(2, comparisons.len());

        assert_eq!(ComparisonKind::EngineSpeedup, comparisons[0].kind);
        assert_eq!(100, comparisons[0].task_count);
        assert!((comparisons[0].factor - 20.0).abs() < 1e-9);
        assert!(!comparisons[0].lower_bound);

        assert_eq!(1000, comparisons[1].task_count);
        assert!((comparisons[1].factor - 100.0).abs() < 1e-9);
        assert!(comparisons[1].lower_bound);
    }

    #[test]
    fn pinning_slowdown_ignores_baseline_primitive() {
        let summaries = vec![
            summary(
                LIGHTWEIGHT_ENGINE,
                Some(CARRIER_BLOCKING_PRIMITIVE),
                64,
                Duration::from_millis(640),
                Completion::Complete,
            ),
            summary(
                LIGHTWEIGHT_ENGINE,
                Some(COOPERATIVE_PRIMITIVE),
                64,
                Duration::from_millis(32),
                Completion::Complete,
            ),
            summary(
                LIGHTWEIGHT_ENGINE,
                Some(UNLOCKED_PRIMITIVE),
                64,
                Duration::from_millis(30),
                Completion::Complete,
            ),
        ];

        let comparisons = compare(&summaries);
        assert_eq!(1, comparisons.len());
        assert_eq!(ComparisonKind::PinningSlowdown, comparisons[0].kind);
        assert!((comparisons[0].factor - 20.0).abs() < 1e-9);
    }

    #[test]
    fn unmatched_scenarios_are_skipped() {
        let summaries = vec![summary(
            LIGHTWEIGHT_ENGINE,
            None,
            100,
            Duration::from_millis(20),
            Completion::Complete,
        )];
        assert!(compare(&summaries).is_empty());
    }
}
