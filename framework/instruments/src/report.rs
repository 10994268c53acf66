mod comparison;
mod json_report;
mod summary_report;

use carrier_bench_summary_model::ScenarioSummary;

pub use comparison::{compare, Comparison, ComparisonKind};
pub use json_report::JsonReportCollector;
pub use summary_report::SummaryReportCollector;

pub trait ReportCollector {
    /// Record a scenario that produced metrics, whether or not it completed.
    fn add_scenario(&mut self, summary: &ScenarioSummary);

    /// Record a scenario that could not produce metrics at all.
    fn add_failure(&mut self, scenario_name: &str, error: &str);

    fn finalize(&self);
}

/// Selects which collectors a [Reporter] fans out to.
#[derive(Debug, Default, Clone)]
pub struct ReportConfig {
    summary: bool,
    json: bool,
}

impl ReportConfig {
    /// Print a line per scenario and a summary table at the end of the run.
    pub fn enable_summary(mut self) -> Self {
        self.summary = true;
        self
    }

    /// Print each scenario summary to stdout as a JSON line.
    pub fn enable_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector + Send>> = Vec::new();
        if self.summary {
            collectors.push(Box::new(SummaryReportCollector::new()));
        }
        if self.json {
            collectors.push(Box::new(JsonReportCollector::new(std::io::stdout())));
        }

        Reporter { collectors }
    }
}

pub struct Reporter {
    collectors: Vec<Box<dyn ReportCollector + Send>>,
}

impl Reporter {
    pub fn add_scenario(&mut self, summary: &ScenarioSummary) {
        for collector in &mut self.collectors {
            collector.add_scenario(summary);
        }
    }

    pub fn add_failure(&mut self, scenario_name: &str, error: &str) {
        for collector in &mut self.collectors {
            collector.add_failure(scenario_name, error);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.finalize();
        }
    }
}

/// One human readable line describing a scenario outcome.
pub fn report_line(summary: &ScenarioSummary) -> String {
    let metrics = &summary.metrics;
    let throughput = metrics
        .throughput
        .map(|t| format!("{t:.1} tasks/s"))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "[{}] duration={:.3}s throughput={} succeeded={} failed={} collected={}/{} status={}",
        summary.scenario_name,
        metrics.elapsed.as_secs_f64(),
        throughput,
        metrics.success_count,
        metrics.failure_count,
        metrics.collected,
        metrics.total_tasks,
        metrics.completion.label(),
    )
}
