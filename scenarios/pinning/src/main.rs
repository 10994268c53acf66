use carrier_bench_runner::prelude::*;
use std::time::Duration;

fn main() -> BenchResult<()> {
    let builder = ScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_default_units(1_000)
        .with_default_hold(Duration::from_millis(10))
        .with_default_timeout(Duration::from_secs(60))
        .use_hazard_comparison();

    run(builder)?.ensure_success()?;

    Ok(())
}
