use tabled::Tabled;

use carrier_bench_summary_model::ScenarioSummary;

#[derive(Tabled)]
pub struct ScenarioRow {
    pub scenario: String,
    pub engine: String,
    pub tasks: u64,
    pub concurrency: usize,
    #[tabled(display = "float3")]
    pub duration_s: f64,
    pub throughput: String,
    pub succeeded: u64,
    pub failed: u64,
    pub peak: usize,
    pub status: String,
    /// Leading characters of [ScenarioSummary::fingerprint]
    pub fingerprint: String,
}

const FINGERPRINT_PREFIX_LEN: usize = 12;

impl From<&ScenarioSummary> for ScenarioRow {
    fn from(summary: &ScenarioSummary) -> Self {
        let metrics = &summary.metrics;
        Self {
            scenario: summary.scenario_name.clone(),
            engine: match &summary.configuration.primitive {
                Some(primitive) => format!("{} ({primitive})", summary.configuration.engine),
                None => summary.configuration.engine.clone(),
            },
            tasks: metrics.total_tasks,
            concurrency: summary.configuration.concurrency,
            duration_s: metrics.elapsed.as_secs_f64(),
            throughput: metrics
                .throughput
                .map(|t| format!("{t:.1}/s"))
                .unwrap_or_else(|| "n/a".to_string()),
            succeeded: metrics.success_count,
            failed: metrics.failure_count,
            peak: metrics.peak_concurrency,
            status: metrics.completion.label().to_string(),
            fingerprint: summary
                .fingerprint()
                .chars()
                .take(FINGERPRINT_PREFIX_LEN)
                .collect(),
        }
    }
}

#[derive(Tabled)]
pub struct ComparisonRow {
    pub comparison: String,
    pub task_count: u64,
    #[tabled(display = "float2")]
    pub delay_ms: f64,
    pub baseline: String,
    pub contender: String,
    pub factor: String,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

fn float3(n: &f64) -> String {
    format!("{:.3}", n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::summary;
    use carrier_bench_summary_model::{Completion, BOUNDED_POOL_ENGINE};
    use std::time::Duration;

    #[test]
    fn row_shows_a_fingerprint_prefix() {
        let summary = summary(
            BOUNDED_POOL_ENGINE,
            None,
            10,
            Duration::from_millis(15),
            Completion::Complete,
        );

        let row = ScenarioRow::from(&summary);

        assert_eq!(FINGERPRINT_PREFIX_LEN, row.fingerprint.len());
        assert!(summary.fingerprint().starts_with(&row.fingerprint));
    }
}
