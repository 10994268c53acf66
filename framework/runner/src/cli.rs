use clap::Parser;

use crate::engine::EngineKind;
use crate::hazard::PrimitiveKind;

/// Command line options shared by every carrier bench scenario.
///
/// Options a scenario has no use for are ignored. Anything left unset falls back to the defaults
/// the scenario configured on its [crate::definition::ScenarioDefinitionBuilder].
#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct CarrierBenchCli {
    /// The execution engine to run the workload on
    #[clap(long, value_enum, default_value_t = EngineSelection::Both)]
    pub engine: EngineSelection,

    /// A named workload size. Can be given more than once, for example `--scale small --scale large`.
    #[clap(long, value_enum)]
    pub scale: Vec<Scale>,

    /// An explicit number of tasks to run. Can be given more than once and combined with `--scale`.
    #[clap(long)]
    pub tasks: Vec<u64>,

    /// The simulated blocking wait of each task, in milliseconds
    #[clap(long)]
    pub delay_ms: Option<u64>,

    /// The number of OS threads in the bounded worker pool
    #[clap(long)]
    pub workers: Option<usize>,

    /// The number of carrier threads for lightweight units. Defaults to one per available core.
    #[clap(long)]
    pub carriers: Option<usize>,

    /// Give up waiting for results after this many seconds
    #[clap(long)]
    pub timeout_s: Option<u64>,

    /// How long to give in-flight work to finish when an engine is shut down, in seconds
    #[clap(long)]
    pub drain_timeout_s: Option<u64>,

    /// Make every n-th task fail, to see failures counted separately from successes
    #[clap(long)]
    pub fail_every: Option<u64>,

    /// The number of units contending for a lock in the pinning scenario
    #[clap(long)]
    pub units: Option<u64>,

    /// How long each unit holds its lock in the pinning scenario, in milliseconds
    #[clap(long)]
    pub hold_ms: Option<u64>,

    /// The number of connections the pinning units share. Units queue for a connection when
    /// there are fewer connections than units.
    #[clap(long)]
    pub connections: Option<usize>,

    /// Restrict the pinning scenario to these primitives. Runs all of them when not given.
    #[clap(long, value_enum)]
    pub primitive: Vec<PrimitiveKind>,

    /// Also print one JSON summary per scenario to stdout
    #[clap(long, default_value = "false")]
    pub json: bool,

    /// Hide the per-scenario progress bar.
    ///
    /// Use it when stderr is captured to a file, where each redraw ends up as another log line.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Use this run id instead of generating one
    #[clap(long)]
    pub run_id: Option<String>,
}

/// Which engines a throughput scenario runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineSelection {
    Bounded,
    Lightweight,
    Both,
}

impl EngineSelection {
    pub fn engines(&self) -> Vec<EngineKind> {
        match self {
            EngineSelection::Bounded => vec![EngineKind::BoundedPool],
            EngineSelection::Lightweight => vec![EngineKind::Lightweight],
            EngineSelection::Both => vec![EngineKind::BoundedPool, EngineKind::Lightweight],
        }
    }
}

/// Named workload sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scale {
    Small,
    Medium,
    Large,
    Extreme,
}

impl Scale {
    pub fn task_count(&self) -> u64 {
        match self {
            Scale::Small => 1_000,
            Scale::Medium => 10_000,
            Scale::Large => 100_000,
            Scale::Extreme => 1_000_000,
        }
    }
}
