mod scenarios_table;

use tabled::settings::Style;
use tabled::Table;

use crate::report::comparison::{compare, ComparisonKind};
use crate::report::summary_report::scenarios_table::{ComparisonRow, ScenarioRow};
use crate::report::{report_line, ReportCollector};
use carrier_bench_summary_model::ScenarioSummary;

/// Prints a line as each scenario finishes, then a table of every scenario and the comparisons
/// between them at the end of the run.
#[derive(Default)]
pub struct SummaryReportCollector {
    summaries: Vec<ScenarioSummary>,
    failures: Vec<(String, String)>,
}

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_summary_of_scenarios(&self) {
        if self.summaries.is_empty() {
            return;
        }

        println!("\nSummary of scenarios");
        let rows = self.summaries.iter().map(ScenarioRow::from).collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("{table}");
    }

    fn print_comparisons(&self) {
        let comparisons = compare(&self.summaries);
        if comparisons.is_empty() {
            return;
        }

        println!("\nComparisons");
        let rows = comparisons
            .into_iter()
            .map(|c| ComparisonRow {
                comparison: match c.kind {
                    ComparisonKind::EngineSpeedup => "engine speedup".to_string(),
                    ComparisonKind::PinningSlowdown => "pinning slowdown".to_string(),
                },
                task_count: c.task_count,
                delay_ms: c.delay.as_secs_f64() * 1000.0,
                baseline: c.baseline,
                contender: c.contender,
                factor: if c.lower_bound {
                    format!(">= {:.2}x", c.factor)
                } else {
                    format!("{:.2}x", c.factor)
                },
            })
            .collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("{table}");
    }

    fn print_failures(&self) {
        if self.failures.is_empty() {
            return;
        }

        println!("\nFailed scenarios");
        for (name, error) in &self.failures {
            println!("[{name}] {error}");
        }
    }
}

impl ReportCollector for SummaryReportCollector {
    fn add_scenario(&mut self, summary: &ScenarioSummary) {
        println!("{}", report_line(summary));
        self.summaries.push(summary.clone());
    }

    fn add_failure(&mut self, scenario_name: &str, error: &str) {
        println!("[{scenario_name}] failed: {error}");
        self.failures
            .push((scenario_name.to_string(), error.to_string()));
    }

    fn finalize(&self) {
        self.print_summary_of_scenarios();
        self.print_comparisons();
        self.print_failures();
    }
}
