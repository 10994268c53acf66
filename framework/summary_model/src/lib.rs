use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::time::Duration;

/// Label used for the bounded worker pool engine in summaries.
pub const BOUNDED_POOL_ENGINE: &str = "bounded-pool";
/// Label used for the lightweight task engine in summaries.
pub const LIGHTWEIGHT_ENGINE: &str = "lightweight";

/// Label for a lock whose holder keeps its carrier blocked.
pub const CARRIER_BLOCKING_PRIMITIVE: &str = "carrier-blocking";
/// Label for a lock whose waiters and holders can give their carrier back.
pub const COOPERATIVE_PRIMITIVE: &str = "cooperative";
/// Label for the lock-free baseline.
pub const UNLOCKED_PRIMITIVE: &str = "unlocked";

/// Whether a scenario collected every result it expected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Every submitted task produced a result.
    Complete,
    /// The scenario timeout fired before every result arrived.
    TimedOut,
    /// The run was asked to stop, for example by Ctrl-C, before every result arrived.
    Interrupted,
}

impl Completion {
    pub fn label(&self) -> &'static str {
        match self {
            Completion::Complete => "complete",
            Completion::TimedOut => "timed-out",
            Completion::Interrupted => "interrupted",
        }
    }
}

/// Aggregate measurements for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMetrics {
    /// The number of tasks the scenario was configured to run.
    pub total_tasks: u64,
    /// The number of distinct task results that were collected.
    ///
    /// Equal to [RunMetrics::total_tasks] when [RunMetrics::completion] is [Completion::Complete].
    pub collected: u64,
    /// Wall-clock time from the first submission until collection stopped.
    pub elapsed: Duration,
    /// Collected tasks per second.
    ///
    /// `None` when nothing ran or no measurable time passed, where a rate is not meaningful.
    pub throughput: Option<f64>,
    pub success_count: u64,
    pub failure_count: u64,
    pub completion: Completion,
    /// The highest number of tasks observed in flight at once.
    ///
    /// For a worker pool this is the number of occupied workers, for lightweight units it is the
    /// number of live units.
    pub peak_concurrency: usize,
}

impl RunMetrics {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    /// How many times faster this run was than `other`, by wall-clock time.
    pub fn speedup_over(&self, other: &RunMetrics) -> Option<f64> {
        if self.elapsed.is_zero() {
            return None;
        }

        Some(other.elapsed.as_secs_f64() / self.elapsed.as_secs_f64())
    }
}

/// The configuration a scenario was run with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigurationSummary {
    /// Either [BOUNDED_POOL_ENGINE] or [LIGHTWEIGHT_ENGINE]
    pub engine: String,
    pub task_count: u64,
    /// Simulated blocking wait per task, or the hold time for hazard scenarios.
    pub delay: Duration,
    /// Worker count for the pool, carrier count for lightweight units.
    pub concurrency: usize,
    pub timeout: Duration,
    /// Synchronization primitive used, only set for hazard scenarios.
    pub primitive: Option<String>,
}

/// Summary of a single scenario within a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Shared by every scenario in the same run.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the scenario started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    pub configuration: ConfigurationSummary,
    pub metrics: RunMetrics,
    /// Free-form labels added by the scenario, for example the business logic in use.
    pub labels: HashMap<String, String>,
    /// The version of carrier bench that produced this summary
    pub carrier_bench_version: String,
}

impl ScenarioSummary {
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        configuration: ConfigurationSummary,
        metrics: RunMetrics,
        carrier_bench_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            configuration,
            metrics,
            labels: HashMap::new(),
            carrier_bench_version,
        }
    }

    /// Add a label
    pub fn add_label(&mut self, key: String, value: String) {
        self.labels.insert(key, value);
    }

    /// Compute a fingerprint for this scenario
    ///
    /// The fingerprint identifies the configuration a scenario was run with, so that repeated runs
    /// of the same configuration can be compared. It uses the
    ///     - Scenario name
    ///     - Configuration
    ///     - Labels
    ///     - Carrier bench version
    ///
    /// Measurements and the run id are not part of the fingerprint.
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());

        let configuration = &self.configuration;
        Digest::update(&mut hasher, configuration.engine.as_bytes());
        Digest::update(&mut hasher, configuration.task_count.to_le_bytes());
        Digest::update(&mut hasher, configuration.delay.as_nanos().to_le_bytes());
        Digest::update(&mut hasher, (configuration.concurrency as u64).to_le_bytes());
        Digest::update(&mut hasher, configuration.timeout.as_nanos().to_le_bytes());
        if let Some(primitive) = &configuration.primitive {
            Digest::update(&mut hasher, primitive.as_bytes());
        }

        self.labels
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.carrier_bench_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// A summary as it is written out, with its fingerprint alongside.
#[derive(Serialize)]
struct StoredSummary<'a> {
    #[serde(flatten)]
    summary: &'a ScenarioSummary,
    fingerprint: String,
}

/// Serialize a scenario summary to a writer as a single JSON line
///
/// The line includes the summary's [ScenarioSummary::fingerprint], which is ignored when reading
/// the line back.
pub fn store_scenario_summary<W: Write>(
    summary: &ScenarioSummary,
    writer: &mut W,
) -> anyhow::Result<()> {
    let stored = StoredSummary {
        summary,
        fingerprint: summary.fingerprint(),
    };
    serde_json::to_writer(&mut *writer, &stored)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Load scenario summaries from a reader containing one JSON object per line
///
/// This is the format produced by [store_scenario_summary].
pub fn load_scenario_summaries<R: Read>(reader: R) -> anyhow::Result<Vec<ScenarioSummary>> {
    let reader = std::io::BufReader::new(reader);
    let mut summaries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summaries.push(serde_json::from_str(&line)?);
    }
    Ok(summaries)
}
