use std::io::Write;

use crate::report::ReportCollector;
use carrier_bench_summary_model::{store_scenario_summary, ScenarioSummary};

/// Writes every scenario summary as a single JSON line, as soon as the scenario finishes.
pub struct JsonReportCollector<W: Write> {
    writer: W,
}

impl<W: Write> JsonReportCollector<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportCollector for JsonReportCollector<W> {
    fn add_scenario(&mut self, summary: &ScenarioSummary) {
        if let Err(e) = store_scenario_summary(summary, &mut self.writer) {
            log::warn!(
                "Failed to write JSON summary for {}: {e:?}",
                summary.scenario_name
            );
        }
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush JSON summary output: {e:?}");
        }
    }

    fn add_failure(&mut self, _scenario_name: &str, _error: &str) {
        // no-op, failed scenarios have no metrics to serialize
    }

    fn finalize(&self) {
        // Nothing is buffered between scenarios.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::summary;
    use carrier_bench_summary_model::{load_scenario_summaries, Completion, LIGHTWEIGHT_ENGINE};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn writes_one_line_per_scenario() {
        let first = summary(
            LIGHTWEIGHT_ENGINE,
            None,
            10,
            Duration::from_millis(15),
            Completion::Complete,
        );
        let second = summary(
            LIGHTWEIGHT_ENGINE,
            None,
            20,
            Duration::from_millis(25),
            Completion::TimedOut,
        );

        let mut collector = JsonReportCollector::new(Vec::new());
        collector.add_scenario(&first);
        collector.add_failure("broken", "resource exhaustion");
        collector.add_scenario(&second);

        let output = collector.into_inner();
        assert_eq!(2, output.iter().filter(|b| **b == b'\n').count());
        assert_eq!(
            vec![first, second],
            load_scenario_summaries(output.as_slice()).unwrap()
        );
    }
}
