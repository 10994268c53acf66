mod bounded;
mod lightweight;

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use carrier_bench_core::prelude::{ExecutionResult, Task, TaskId};
use carrier_bench_summary_model::{BOUNDED_POOL_ENGINE, LIGHTWEIGHT_ENGINE};

use crate::control::RunControl;

pub use bounded::BoundedWorkerPoolEngine;
pub use lightweight::{default_carriers, LightweightTaskEngine};

/// How often a collector wakes up to check the deadline and the shutdown signal.
const COLLECT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often submission checks whether the scenario deadline has passed.
const SUBMIT_DEADLINE_CHECK_EVERY: u64 = 1024;

/// The furthest a deadline is ever placed, for timeouts too large to add to an [Instant].
pub(crate) const MAX_DEADLINE_OFFSET: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Selects the concurrency model used to execute a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum EngineKind {
    /// A fixed pool of OS threads. A waiting task keeps its thread.
    BoundedPool,
    /// Tokio tasks multiplexed onto a few carrier threads. A waiting task frees its carrier.
    Lightweight,
}

impl EngineKind {
    pub fn label(&self) -> &'static str {
        match self {
            EngineKind::BoundedPool => BOUNDED_POOL_ENGINE,
            EngineKind::Lightweight => LIGHTWEIGHT_ENGINE,
        }
    }
}

/// Returned from [ExecutionEngine::submit] for every accepted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: TaskId,
    /// Position of this task in the engine's submission order, starting at zero.
    pub sequence: u64,
}

/// Everything an engine produced for one call to [ExecutionEngine::run_all].
#[derive(Debug)]
pub struct EngineRun {
    pub submitted: u64,
    pub results: Vec<ExecutionResult>,
    pub elapsed: Duration,
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A worker or carrier could not be created, either because the request is over the configured
    /// limit or because the operating system refused.
    #[display(
        "resource exhaustion: could not allocate {requested} {resource}(s) (limit {limit}): {reason}"
    )]
    ResourceExhaustion {
        resource: &'static str,
        requested: usize,
        limit: usize,
        reason: String,
    },
    #[display("invalid engine configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[display("the engine has already been shut down")]
    ShutDown,
}

/// `start + timeout`, clamped so that a very large timeout behaves as no timeout at all.
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout.min(MAX_DEADLINE_OFFSET))
        .or_else(|| start.checked_add(Duration::from_secs(24 * 60 * 60)))
        .unwrap_or(start)
}

pub(crate) fn check_capacity(
    resource: &'static str,
    requested: usize,
    limit: usize,
) -> Result<(), EngineError> {
    if requested == 0 {
        return Err(EngineError::InvalidConfiguration {
            reason: format!("at least one {resource} is required"),
        });
    }

    if requested > limit {
        return Err(EngineError::ResourceExhaustion {
            resource,
            requested,
            limit,
            reason: "requested more than the configured limit".to_string(),
        });
    }

    Ok(())
}

/// A concurrency model that can execute [Task]s and hand back their results.
pub trait ExecutionEngine {
    fn kind(&self) -> EngineKind;

    /// Hand a task to the engine. Returns once the task is queued, not once it has run.
    fn submit(&mut self, task: Task) -> Result<TaskHandle, EngineError>;

    /// Wait for results until `expected` have arrived, the deadline passes or the run is
    /// interrupted. Whatever arrived is returned.
    fn collect(
        &mut self,
        expected: u64,
        deadline: Instant,
        control: &RunControl,
    ) -> Vec<ExecutionResult>;

    /// The highest number of tasks seen in flight at once.
    fn peak_concurrency(&self) -> usize;

    /// Release every worker or carrier, giving in-flight work up to `drain_timeout` to finish.
    ///
    /// Calling this more than once is a no-op.
    fn shutdown(&mut self, drain_timeout: Duration);

    /// Submit every task and collect their results, blocking until all of them have completed or
    /// `timeout` has elapsed.
    fn run_all(
        &mut self,
        tasks: &mut dyn Iterator<Item = Task>,
        timeout: Duration,
        control: &RunControl,
    ) -> Result<EngineRun, EngineError> {
        let started = Instant::now();
        let deadline = deadline_after(started, timeout);

        let mut submitted = 0;
        for task in tasks {
            self.submit(task)?;
            submitted += 1;

            if submitted % SUBMIT_DEADLINE_CHECK_EVERY == 0
                && (Instant::now() >= deadline || control.interrupted())
            {
                log::warn!(
                    "Stopped submitting after {submitted} tasks, the scenario ran out of time or was interrupted"
                );
                break;
            }
        }
        log::debug!("Submitted {submitted} tasks to the {} engine", self.kind().label());

        let results = self.collect(submitted, deadline, control);

        Ok(EngineRun {
            submitted,
            results,
            elapsed: started.elapsed(),
        })
    }
}

/// Drain a result channel shared by an engine's workers.
pub(crate) fn collect_from(
    receiver: &Receiver<ExecutionResult>,
    expected: u64,
    deadline: Instant,
    control: &RunControl,
) -> Vec<ExecutionResult> {
    let mut results = Vec::with_capacity(expected.min(1 << 20) as usize);

    while (results.len() as u64) < expected {
        if control.interrupted() {
            log::warn!(
                "Run interrupted with {} results outstanding",
                expected - results.len() as u64
            );
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "Deadline reached with {} results outstanding",
                expected - results.len() as u64
            );
            break;
        }

        let wake_at = deadline_after(now, COLLECT_POLL_INTERVAL).min(deadline);
        match receiver.recv_deadline(wake_at) {
            Ok(result) => {
                results.push(result);
                // Take whatever else is ready without waiting
                let before = results.len();
                results.extend(
                    receiver
                        .try_iter()
                        .take((expected as usize).saturating_sub(before)),
                );
                control.record_completed((results.len() - before + 1) as u64);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::error!(
                    "Result channel closed with {} results outstanding",
                    expected - results.len() as u64
                );
                break;
            }
        }
    }

    results
}

/// Owns an engine for the duration of a scenario and shuts it down on every exit path, including
/// early returns and unwinding.
pub struct EngineGuard {
    engine: Box<dyn ExecutionEngine + Send>,
    drain_timeout: Duration,
}

impl EngineGuard {
    pub fn new(engine: Box<dyn ExecutionEngine + Send>, drain_timeout: Duration) -> Self {
        Self {
            engine,
            drain_timeout,
        }
    }
}

impl Deref for EngineGuard {
    type Target = dyn ExecutionEngine + Send;

    fn deref(&self) -> &Self::Target {
        self.engine.as_ref()
    }
}

impl DerefMut for EngineGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine.as_mut()
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        log::debug!("Releasing {} engine", self.engine.kind().label());
        self.engine.shutdown(self.drain_timeout);
    }
}
