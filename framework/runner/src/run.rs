use anyhow::Context;

use carrier_bench_core::prelude::{generate, BusinessLogic, ShutdownSignalError};
use carrier_bench_instruments::{aggregate, ReportConfig};
use carrier_bench_summary_model::{Completion, RunMetrics, ScenarioSummary};

use crate::control::RunControl;
use crate::definition::{ScenarioDefinitionBuilder, ScenarioPlan};
use crate::engine::{
    BoundedWorkerPoolEngine, EngineError, EngineGuard, EngineKind, ExecutionEngine,
    LightweightTaskEngine,
};
use crate::error::ScenarioError;
use crate::hazard::run_hazard_scenario;
use crate::matrix::EngineConfiguration;
use crate::shutdown::start_shutdown_listener;

/// What happened to one planned scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOutcome {
    /// Metrics were produced. The scenario may still have timed out or been interrupted.
    Completed(ScenarioSummary),
    /// No metrics could be produced.
    Failed {
        scenario_name: String,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    pub fn summaries(&self) -> Vec<&ScenarioSummary> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ScenarioOutcome::Completed(summary) => Some(summary),
                ScenarioOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ScenarioOutcome::Failed { .. }))
            .count()
    }

    /// An error if any scenario failed, so that a scenario binary exits with a non-zero code.
    pub fn ensure_success(&self) -> anyhow::Result<()> {
        match self.failure_count() {
            0 => Ok(()),
            failed => anyhow::bail!("{failed} of {} scenarios failed", self.outcomes.len()),
        }
    }
}

/// Run every scenario the builder defines, one after another, and report on them.
///
/// A scenario that fails does not stop the ones after it. Ctrl-C interrupts the scenario in
/// progress and skips the rest.
pub fn run(definition: ScenarioDefinitionBuilder) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("control")
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    let shutdown_handle = definition.shutdown_handle.clone();
    start_shutdown_listener(&runtime, shutdown_handle.clone());

    let run_id = definition
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    log::info!("Run id: {run_id}");

    let mut report_config = ReportConfig::default().enable_summary();
    if definition.json {
        report_config = report_config.enable_json();
    }
    let mut reporter = report_config.init();

    let mut outcomes = Vec::with_capacity(definition.plans.len());
    for plan in &definition.plans {
        let scenario_name = plan.name(&definition.name);

        if shutdown_handle.is_shutdown() {
            let error = ScenarioError::from(ShutdownSignalError::default());
            log::warn!("Skipping {scenario_name}: {error}");
            reporter.add_failure(&scenario_name, &error.to_string());
            outcomes.push(ScenarioOutcome::Failed {
                scenario_name,
                error: error.to_string(),
            });
            continue;
        }

        let started_at = chrono::Utc::now().timestamp();
        let control = RunControl::new(
            &scenario_name,
            plan.expected(),
            !definition.no_progress,
            shutdown_handle.new_listener(),
        );

        let result = match plan {
            ScenarioPlan::Throughput(config) => {
                run_scenario(config, definition.business_logic.clone(), &control)
            }
            ScenarioPlan::Hazard(config) => run_hazard_scenario(config, &control),
        };
        control.finish();

        match result {
            Ok(metrics) => {
                let mut summary = ScenarioSummary::new(
                    run_id.clone(),
                    scenario_name,
                    started_at,
                    plan.configuration_summary(),
                    metrics,
                    env!("CARGO_PKG_VERSION").to_string(),
                );
                match plan {
                    ScenarioPlan::Throughput(_) => summary.add_label(
                        "business_logic".to_string(),
                        definition.business_logic_name.clone(),
                    ),
                    ScenarioPlan::Hazard(config) => summary
                        .add_label("connections".to_string(), config.connections.to_string()),
                }

                reporter.add_scenario(&summary);
                outcomes.push(ScenarioOutcome::Completed(summary));
            }
            Err(e) => {
                log::error!("Scenario {scenario_name} failed: {e}");
                reporter.add_failure(&scenario_name, &e.to_string());
                outcomes.push(ScenarioOutcome::Failed {
                    scenario_name,
                    error: e.to_string(),
                });
            }
        }
    }

    reporter.finalize();
    runtime.shutdown_background();

    Ok(RunReport { run_id, outcomes })
}

/// Create the engine a configuration asks for.
pub fn build_engine(
    config: &EngineConfiguration,
) -> Result<Box<dyn ExecutionEngine + Send>, EngineError> {
    Ok(match config.engine {
        EngineKind::BoundedPool => Box::new(BoundedWorkerPoolEngine::new(
            config.concurrency,
            config.worker_stack_size,
            config.concurrency_limit,
        )?),
        EngineKind::Lightweight => Box::new(LightweightTaskEngine::new(
            config.concurrency,
            config.concurrency_limit,
        )?),
    })
}

/// Run one throughput scenario: generate the workload, execute it and aggregate the results.
///
/// The engine is shut down before this returns, on every path.
pub fn run_scenario(
    config: &EngineConfiguration,
    business_logic: BusinessLogic,
    control: &RunControl,
) -> Result<RunMetrics, ScenarioError> {
    log::info!(
        "Running {} tasks with a {:?} wait on the {} engine, concurrency {}",
        config.task_count,
        config.delay,
        config.engine.label(),
        config.concurrency
    );

    let mut engine = EngineGuard::new(build_engine(config)?, config.drain_timeout);
    let mut tasks = generate(config.task_count, config.delay, business_logic);
    let run = engine.run_all(&mut tasks, config.timeout, control)?;

    let mut metrics = aggregate(
        config.task_count,
        &run.results,
        run.elapsed,
        engine.peak_concurrency(),
    );

    if metrics.completion == Completion::TimedOut {
        if control.interrupted() {
            metrics.completion = Completion::Interrupted;
        } else {
            log::warn!(
                "Scenario timed out after {:?} with {} of {} results collected",
                config.timeout,
                metrics.collected,
                metrics.total_tasks
            );
        }
    }

    log::info!(
        "Finished in {:.3}s: {} succeeded, {} failed, {}",
        metrics.elapsed.as_secs_f64(),
        metrics.success_count,
        metrics.failure_count,
        metrics.completion.label()
    );

    Ok(metrics)
}
