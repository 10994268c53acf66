use carrier_bench_runner::prelude::*;
use std::time::Duration;

fn main() -> BenchResult<()> {
    let builder = ScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_default_task_counts(vec![Scale::Small.task_count(), Scale::Medium.task_count()])
        .with_default_delay(Duration::from_millis(10))
        .with_default_timeout(Duration::from_secs(120));

    let report = run(builder)?;
    report.ensure_success()?;

    Ok(())
}
