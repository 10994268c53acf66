mod aggregate;
mod gauge;
mod report;

pub use aggregate::aggregate;
pub use gauge::{ConcurrencyGauge, GaugeGuard};
pub use report::{
    compare, report_line, Comparison, ComparisonKind, JsonReportCollector, ReportCollector,
    ReportConfig, Reporter, SummaryReportCollector,
};
