use std::sync::Arc;
use std::time::Duration;

use carrier_bench_instruments::{compare, ComparisonKind};
use carrier_bench_runner::prelude::{
    run, CarrierBenchCli, Completion, EngineSelection, ScenarioDefinitionBuilder, ScenarioOutcome,
    ShutdownHandle, TaskId,
};

fn sample_cli_cfg() -> CarrierBenchCli {
    CarrierBenchCli {
        engine: EngineSelection::Both,
        scale: vec![],
        tasks: vec![],
        delay_ms: None,
        workers: None,
        carriers: None,
        timeout_s: None,
        drain_timeout_s: None,
        fail_every: None,
        units: None,
        hold_ms: None,
        connections: None,
        primitive: vec![],
        json: false,
        no_progress: true,
        run_id: None,
    }
}

#[test]
fn runs_every_engine_for_every_task_count() {
    let scenario = ScenarioDefinitionBuilder::new(
        "runs_every_engine_for_every_task_count",
        CarrierBenchCli {
            tasks: vec![10, 20],
            run_id: Some("test-run".to_string()),
            ..sample_cli_cfg()
        },
    )
    .with_default_delay(Duration::from_millis(1))
    .with_default_workers(4)
    .with_default_carriers(2);

    let report = run(scenario).unwrap();

    assert_eq!("test-run", report.run_id);
    assert_eq!(0, report.failure_count());
    let summaries = report.summaries();
    assert_eq!(4, summaries.len());
    assert!(summaries.iter().all(|s| s.run_id == "test-run"));
    assert!(summaries.iter().all(|s| s.metrics.is_complete()));
    assert_eq!(
        Some(&"always-ok".to_string()),
        summaries[0].labels.get("business_logic")
    );
    report.ensure_success().unwrap();
}

#[test]
fn resource_exhaustion_does_not_stop_other_scenarios() {
    let scenario = ScenarioDefinitionBuilder::new(
        "resource_exhaustion_does_not_stop_other_scenarios",
        CarrierBenchCli {
            tasks: vec![5],
            workers: Some(100),
            carriers: Some(2),
            ..sample_cli_cfg()
        },
    )
    .with_default_delay(Duration::ZERO)
    .with_concurrency_limit(50);

    let report = run(scenario).unwrap();

    assert_eq!(2, report.outcomes.len());
    assert!(matches!(
        &report.outcomes[0],
        ScenarioOutcome::Failed { error, .. } if error.starts_with("resource exhaustion")
    ));
    assert!(matches!(
        &report.outcomes[1],
        ScenarioOutcome::Completed(summary) if summary.metrics.success_count == 5
    ));
    assert!(report.ensure_success().is_err());
}

#[test]
fn zero_tasks_report_no_throughput() {
    let scenario = ScenarioDefinitionBuilder::new(
        "zero_tasks_report_no_throughput",
        CarrierBenchCli {
            engine: EngineSelection::Lightweight,
            tasks: vec![0],
            ..sample_cli_cfg()
        },
    );

    let report = run(scenario).unwrap();

    let summaries = report.summaries();
    assert_eq!(1, summaries.len());
    assert_eq!(None, summaries[0].metrics.throughput);
    assert_eq!(0, summaries[0].metrics.collected);
}

#[test]
fn repeated_runs_give_the_same_counts() {
    let counts = || {
        let scenario = ScenarioDefinitionBuilder::new(
            "repeated_runs_give_the_same_counts",
            CarrierBenchCli {
                tasks: vec![30],
                fail_every: Some(4),
                ..sample_cli_cfg()
            },
        )
        .with_default_delay(Duration::from_millis(1))
        .with_default_workers(4)
        .with_default_carriers(2);

        run(scenario)
            .unwrap()
            .summaries()
            .iter()
            .map(|s| (s.metrics.success_count, s.metrics.failure_count))
            .collect::<Vec<_>>()
    };

    let first = counts();
    assert_eq!(vec![(22, 8), (22, 8)], first);
    assert_eq!(first, counts());
}

#[test]
fn hazard_comparison_reports_each_primitive() {
    let scenario = ScenarioDefinitionBuilder::new(
        "hazard_comparison_reports_each_primitive",
        CarrierBenchCli {
            units: Some(16),
            hold_ms: Some(5),
            carriers: Some(2),
            ..sample_cli_cfg()
        },
    )
    .use_hazard_comparison();

    let report = run(scenario).unwrap();

    let primitives = report
        .summaries()
        .iter()
        .map(|s| s.configuration.primitive.clone().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(
        vec!["carrier-blocking", "cooperative", "unlocked"],
        primitives
    );
}

#[test]
fn pinning_slowdown_is_reported_for_a_hazard_run() {
    let scenario = ScenarioDefinitionBuilder::new(
        "pinning_slowdown_is_reported_for_a_hazard_run",
        CarrierBenchCli {
            units: Some(64),
            hold_ms: Some(20),
            carriers: Some(2),
            connections: Some(64),
            ..sample_cli_cfg()
        },
    )
    .use_hazard_comparison();

    let report = run(scenario).unwrap();
    let summaries = report
        .summaries()
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();

    let comparisons = compare(&summaries);
    assert_eq!(1, comparisons.len());
    assert_eq!(ComparisonKind::PinningSlowdown, comparisons[0].kind);
    assert!(comparisons[0].factor >= 10.0, "{:?}", comparisons[0]);
    assert_eq!(
        Some(&"64".to_string()),
        summaries[0].labels.get("connections")
    );
}

#[test]
fn shutdown_during_a_run_fails_the_remaining_scenarios() {
    let shutdown_handle = ShutdownHandle::new();
    let signal = shutdown_handle.clone();

    let scenario = ScenarioDefinitionBuilder::new(
        "shutdown_during_a_run_fails_the_remaining_scenarios",
        CarrierBenchCli {
            engine: EngineSelection::Lightweight,
            tasks: vec![5, 10, 20],
            ..sample_cli_cfg()
        },
    )
    .with_default_delay(Duration::from_millis(1))
    .with_default_carriers(2)
    .with_shutdown_handle(shutdown_handle)
    .use_business_logic(
        "stop-the-run",
        Arc::new(move |id: TaskId| -> anyhow::Result<u64> {
            signal.shutdown();
            Ok(id)
        }),
    );

    let report = run(scenario).unwrap();

    assert_eq!(3, report.outcomes.len());
    assert!(matches!(
        &report.outcomes[0],
        ScenarioOutcome::Completed(summary)
            if matches!(summary.metrics.completion, Completion::Complete | Completion::Interrupted)
    ));
    for outcome in &report.outcomes[1..] {
        assert!(matches!(
            outcome,
            ScenarioOutcome::Failed { error, .. } if error.contains("cancelled by shutdown signal")
        ));
    }
    assert_eq!(2, report.failure_count());
    assert!(report.ensure_success().is_err());
}
