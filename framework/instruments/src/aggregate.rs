use std::collections::HashSet;
use std::time::Duration;

use carrier_bench_core::prelude::ExecutionResult;
use carrier_bench_summary_model::{Completion, RunMetrics};

/// Reduce the raw results of one scenario into [RunMetrics].
///
/// `expected` is the number of tasks the scenario was configured with. The run is
/// [Completion::Complete] only if a result arrived for every one of them, otherwise it is reported
/// as [Completion::TimedOut]; callers that know the run was interrupted can override that.
///
/// A task id that shows up more than once is counted once and logged, so a misbehaving engine can
/// not inflate the counts.
pub fn aggregate(
    expected: u64,
    results: &[ExecutionResult],
    elapsed: Duration,
    peak_concurrency: usize,
) -> RunMetrics {
    let mut seen = HashSet::with_capacity(results.len());
    let mut success_count = 0;
    let mut failure_count = 0;
    let mut duplicates = 0;

    for result in results {
        if !seen.insert(result.id) {
            duplicates += 1;
            continue;
        }

        if result.is_success() {
            success_count += 1;
        } else {
            failure_count += 1;
        }
    }

    if duplicates > 0 {
        log::error!("Discarded {duplicates} duplicate results while aggregating");
    }

    let collected = success_count + failure_count;
    let throughput = if collected == 0 || elapsed.is_zero() {
        None
    } else {
        Some(collected as f64 / elapsed.as_secs_f64())
    };

    let completion = if collected >= expected {
        Completion::Complete
    } else {
        Completion::TimedOut
    };

    RunMetrics {
        total_tasks: expected,
        collected,
        elapsed,
        throughput,
        success_count,
        failure_count,
        completion,
        peak_concurrency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_bench_core::prelude::TaskExecutionFailure;
    use pretty_assertions::assert_eq;

    fn ok(id: u64) -> ExecutionResult {
        ExecutionResult::new(id, Ok(id), Duration::from_millis(1))
    }

    fn failed(id: u64) -> ExecutionResult {
        ExecutionResult::new(
            id,
            Err(TaskExecutionFailure::new(id, "boom")),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn counts_add_up() {
        let results = vec![ok(0), failed(1), ok(2), ok(3), failed(4)];
        let metrics = aggregate(5, &results, Duration::from_secs(2), 3);

        assert_eq!(3, metrics.success_count);
        assert_eq!(2, metrics.failure_count);
        assert_eq!(
            metrics.total_tasks,
            metrics.success_count + metrics.failure_count
        );
        assert_eq!(Completion::Complete, metrics.completion);
        assert_eq!(Some(2.5), metrics.throughput);
        assert_eq!(3, metrics.peak_concurrency);
    }

    #[test]
    fn zero_tasks_has_no_throughput() {
        let metrics = aggregate(0, &[], Duration::ZERO, 0);
        assert_eq!(None, metrics.throughput);
        assert_eq!(Completion::Complete, metrics.completion);
        assert_eq!(0, metrics.collected);
    }

    #[test]
    fn zero_duration_has_no_throughput() {
        let metrics = aggregate(1, &[ok(0)], Duration::ZERO, 1);
        assert_eq!(None, metrics.throughput);
        assert!(metrics.is_complete());
    }

    #[test]
    fn missing_results_are_timed_out() {
        let results = vec![ok(0), ok(1)];
        let metrics = aggregate(10, &results, Duration::from_secs(1), 2);
        assert_eq!(Completion::TimedOut, metrics.completion);
        assert_eq!(2, metrics.collected);
        assert_eq!(10, metrics.total_tasks);
        assert_eq!(Some(2.0), metrics.throughput);
    }

    #[test]
    fn duplicates_are_not_counted() {
        let results = vec![ok(0), ok(0), failed(1), failed(1)];
        let metrics = aggregate(3, &results, Duration::from_secs(1), 1);
        assert_eq!(1, metrics.success_count);
        assert_eq!(1, metrics.failure_count);
        assert_eq!(Completion::TimedOut, metrics.completion);
    }
}
