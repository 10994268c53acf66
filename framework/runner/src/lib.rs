mod cli;
mod control;
mod definition;
mod engine;
mod error;
mod hazard;
mod init;
mod matrix;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{CarrierBenchCli, EngineSelection, Scale};
    pub use crate::control::RunControl;
    pub use crate::definition::{
        ScenarioDefinitionBuilder, ScenarioPlan, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_DELAY,
        DEFAULT_CONNECTIONS, DEFAULT_DRAIN_TIMEOUT, DEFAULT_HOLD, DEFAULT_TIMEOUT, DEFAULT_UNITS,
        DEFAULT_WORKER_STACK_SIZE, DEFAULT_WORKERS,
    };
    pub use crate::engine::{
        default_carriers, BoundedWorkerPoolEngine, EngineError, EngineGuard, EngineKind,
        EngineRun, ExecutionEngine, LightweightTaskEngine, TaskHandle,
    };
    pub use crate::error::ScenarioError;
    pub use crate::hazard::{run_hazard_scenario, HazardConfiguration, PrimitiveKind};
    pub use crate::init::init;
    pub use crate::matrix::{EngineConfiguration, EngineSettings, ScenarioMatrix};
    pub use crate::run::{build_engine, run, run_scenario, RunReport, ScenarioOutcome};
    pub use crate::types::BenchResult;

    pub use carrier_bench_core::prelude::{
        always_ok, fail_every, generate, panic_every, BusinessLogic, ExecutionResult,
        ShutdownHandle, Task, TaskExecutionFailure, TaskId, TaskState,
    };
    pub use carrier_bench_summary_model::{Completion, RunMetrics, ScenarioSummary};
}
