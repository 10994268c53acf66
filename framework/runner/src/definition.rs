use std::time::Duration;

use carrier_bench_core::prelude::{always_ok, fail_every, BusinessLogic, ShutdownHandle};
use carrier_bench_summary_model::{ConfigurationSummary, LIGHTWEIGHT_ENGINE};

use crate::cli::{CarrierBenchCli, Scale};
use crate::engine::default_carriers;
use crate::hazard::{HazardConfiguration, PrimitiveKind};
use crate::init::init;
use crate::matrix::{EngineConfiguration, EngineSettings, ScenarioMatrix};

pub const DEFAULT_WORKERS: usize = 64;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WORKER_STACK_SIZE: usize = 2 * 1024 * 1024;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10_000;
pub const DEFAULT_UNITS: u64 = 1_000;
pub const DEFAULT_HOLD: Duration = Duration::from_millis(10);
pub const DEFAULT_CONNECTIONS: usize = 256;

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario binary to define what it runs. Every
/// `with_default_*` value can be overridden from the command line.
pub struct ScenarioDefinitionBuilder {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// This value is initialised for you and you cannot change it.
    #[doc(hidden)]
    cli: CarrierBenchCli,
    default_task_counts: Vec<u64>,
    default_delay: Duration,
    default_workers: usize,
    default_carriers: Option<usize>,
    default_timeout: Duration,
    default_drain_timeout: Duration,
    worker_stack_size: usize,
    concurrency_limit: usize,
    default_units: u64,
    default_hold: Duration,
    default_connections: usize,
    /// Signalled on Ctrl-C. Can be replaced to stop a run from code.
    shutdown_handle: ShutdownHandle,
    /// The business logic every task runs after its simulated wait, with a name for reports.
    business_logic: Option<(String, BusinessLogic)>,
    /// Run the pinning hazard comparison instead of the engine throughput matrix.
    hazard_comparison: bool,
}

/// A single scenario to run, either on an execution engine or through the hazard demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioPlan {
    Throughput(EngineConfiguration),
    Hazard(HazardConfiguration),
}

impl ScenarioPlan {
    /// The name this plan is reported under, for example `io_throughput/bounded-pool/1000`.
    pub fn name(&self, scenario_name: &str) -> String {
        match self {
            ScenarioPlan::Throughput(config) => format!(
                "{scenario_name}/{}/{}",
                config.engine.label(),
                config.task_count
            ),
            ScenarioPlan::Hazard(config) => format!(
                "{scenario_name}/{}/{}",
                config.primitive.label(),
                config.unit_count
            ),
        }
    }

    /// The number of results this plan should produce.
    pub fn expected(&self) -> u64 {
        match self {
            ScenarioPlan::Throughput(config) => config.task_count,
            ScenarioPlan::Hazard(config) => config.unit_count,
        }
    }

    pub fn configuration_summary(&self) -> ConfigurationSummary {
        match self {
            ScenarioPlan::Throughput(config) => ConfigurationSummary {
                engine: config.engine.label().to_string(),
                task_count: config.task_count,
                delay: config.delay,
                concurrency: config.concurrency,
                timeout: config.timeout,
                primitive: None,
            },
            ScenarioPlan::Hazard(config) => ConfigurationSummary {
                engine: LIGHTWEIGHT_ENGINE.to_string(),
                task_count: config.unit_count,
                delay: config.hold,
                concurrency: config.carriers,
                timeout: config.timeout,
                primitive: Some(config.primitive.label().to_string()),
            },
        }
    }
}

pub struct ScenarioDefinition {
    pub name: String,
    pub plans: Vec<ScenarioPlan>,
    pub business_logic_name: String,
    pub business_logic: BusinessLogic,
    pub json: bool,
    pub no_progress: bool,
    pub run_id: Option<String>,
    pub shutdown_handle: ShutdownHandle,
}

impl ScenarioDefinitionBuilder {
    /// Initialise a new scenario definition from the scenario name and parsed command line
    /// arguments. See the [ScenarioDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: CarrierBenchCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_task_counts: vec![Scale::Small.task_count()],
            default_delay: DEFAULT_DELAY,
            default_workers: DEFAULT_WORKERS,
            default_carriers: None,
            default_timeout: DEFAULT_TIMEOUT,
            default_drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            default_units: DEFAULT_UNITS,
            default_hold: DEFAULT_HOLD,
            default_connections: DEFAULT_CONNECTIONS,
            shutdown_handle: ShutdownHandle::new(),
            business_logic: None,
            hazard_comparison: false,
        }
    }

    /// Initialise logging, parse the command line and create a new scenario definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, init())
    }

    /// Task counts to run when neither `--scale` nor `--tasks` is given.
    pub fn with_default_task_counts(mut self, task_counts: Vec<u64>) -> Self {
        self.default_task_counts = task_counts;
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.default_workers = workers;
        self
    }

    /// Defaults to one carrier per available core when not set.
    pub fn with_default_carriers(mut self, carriers: usize) -> Self {
        self.default_carriers = Some(carriers);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.default_drain_timeout = drain_timeout;
        self
    }

    /// The stack size of each pool worker. There is no command line flag for this.
    pub fn with_worker_stack_size(mut self, worker_stack_size: usize) -> Self {
        self.worker_stack_size = worker_stack_size;
        self
    }

    /// The most workers or carriers any engine may create. There is no command line flag for this.
    pub fn with_concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }

    pub fn with_default_units(mut self, units: u64) -> Self {
        self.default_units = units;
        self
    }

    pub fn with_default_hold(mut self, hold: Duration) -> Self {
        self.default_hold = hold;
        self
    }

    /// The number of connection monitors the pinning units share.
    pub fn with_default_connections(mut self, connections: usize) -> Self {
        self.default_connections = connections;
        self
    }

    /// Stop the run when `shutdown_handle` is signalled, as well as on Ctrl-C.
    ///
    /// The scenario in progress is interrupted and the ones after it are recorded as failed.
    pub fn with_shutdown_handle(mut self, shutdown_handle: ShutdownHandle) -> Self {
        self.shutdown_handle = shutdown_handle;
        self
    }

    /// Set the business logic that each task runs once its simulated wait is over.
    ///
    /// Tasks return their own id when this is not set. `--fail-every` takes precedence over it.
    pub fn use_business_logic(mut self, name: &str, business_logic: BusinessLogic) -> Self {
        self.business_logic = Some((name.to_string(), business_logic));
        self
    }

    /// Run the lock primitives against each other instead of the engines.
    pub fn use_hazard_comparison(mut self) -> Self {
        self.hazard_comparison = true;
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition> {
        let cli = &self.cli;
        let carriers = cli
            .carriers
            .or(self.default_carriers)
            .unwrap_or_else(default_carriers);
        let timeout = cli
            .timeout_s
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);
        let drain_timeout = cli
            .drain_timeout_s
            .map(Duration::from_secs)
            .unwrap_or(self.default_drain_timeout);

        let plans = if self.hazard_comparison {
            let primitives = if cli.primitive.is_empty() {
                PrimitiveKind::ALL.to_vec()
            } else {
                cli.primitive.clone()
            };
            let base = HazardConfiguration {
                unit_count: cli.units.unwrap_or(self.default_units),
                hold: cli
                    .hold_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.default_hold),
                carriers,
                connections: cli.connections.unwrap_or(self.default_connections),
                primitive: PrimitiveKind::CarrierBlocking,
                timeout,
                drain_timeout,
                carrier_limit: self.concurrency_limit,
            };

            primitives
                .into_iter()
                .map(|primitive| ScenarioPlan::Hazard(base.with_primitive(primitive)))
                .collect::<Vec<_>>()
        } else {
            let mut task_counts = cli
                .scale
                .iter()
                .map(Scale::task_count)
                .chain(cli.tasks.iter().copied())
                .collect::<Vec<_>>();
            if task_counts.is_empty() {
                task_counts = self.default_task_counts.clone();
            }

            let matrix = ScenarioMatrix {
                engines: cli.engine.engines(),
                task_counts,
            };
            let settings = EngineSettings {
                delay: cli
                    .delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.default_delay),
                workers: cli.workers.unwrap_or(self.default_workers),
                carriers,
                timeout,
                drain_timeout,
                worker_stack_size: self.worker_stack_size,
                concurrency_limit: self.concurrency_limit,
            };

            matrix
                .expand(&settings)
                .into_iter()
                .map(ScenarioPlan::Throughput)
                .collect::<Vec<_>>()
        };

        if plans.is_empty() {
            anyhow::bail!("Scenario [{}] has nothing to run", self.name);
        }

        let (business_logic_name, business_logic) = match cli.fail_every {
            Some(n) => (format!("fail-every-{n}"), fail_every(n)),
            None => self
                .business_logic
                .unwrap_or_else(|| ("always-ok".to_string(), always_ok())),
        };

        Ok(ScenarioDefinition {
            name: self.name,
            plans,
            business_logic_name,
            business_logic,
            json: self.cli.json,
            no_progress: self.cli.no_progress,
            run_id: self.cli.run_id,
            shutdown_handle: self.shutdown_handle,
        })
    }
}
