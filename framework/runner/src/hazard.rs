use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{self, JoinError, JoinSet};

use carrier_bench_core::prelude::{ExecutionResult, TaskExecutionFailure, TaskId};
use carrier_bench_instruments::{aggregate, ConcurrencyGauge};
use carrier_bench_summary_model::{
    Completion, RunMetrics, CARRIER_BLOCKING_PRIMITIVE, COOPERATIVE_PRIMITIVE, UNLOCKED_PRIMITIVE,
};

use crate::control::RunControl;
use crate::engine::{deadline_after, EngineError, ExecutionEngine, LightweightTaskEngine};
use crate::error::ScenarioError;

/// The lock used to guard each unit's critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PrimitiveKind {
    /// A thread-blocking lock held across a thread-blocking wait. The holder cannot give its
    /// carrier back.
    CarrierBlocking,
    /// An async lock held across an awaited wait.
    Cooperative,
    /// No lock at all, an atomic counter and an awaited wait.
    Unlocked,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 3] = [
        PrimitiveKind::CarrierBlocking,
        PrimitiveKind::Cooperative,
        PrimitiveKind::Unlocked,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PrimitiveKind::CarrierBlocking => CARRIER_BLOCKING_PRIMITIVE,
            PrimitiveKind::Cooperative => COOPERATIVE_PRIMITIVE,
            PrimitiveKind::Unlocked => UNLOCKED_PRIMITIVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardConfiguration {
    pub unit_count: u64,
    /// How long each unit waits while holding its connection.
    pub hold: Duration,
    pub carriers: usize,
    /// The number of connection monitors the units share. Unit `n` uses connection
    /// `n % connections`.
    pub connections: usize,
    pub primitive: PrimitiveKind,
    pub timeout: Duration,
    pub drain_timeout: Duration,
    pub carrier_limit: usize,
}

impl HazardConfiguration {
    pub fn with_primitive(&self, primitive: PrimitiveKind) -> Self {
        Self {
            primitive,
            ..self.clone()
        }
    }
}

/// The connection monitors and the counter every unit increments, guarded by the configured
/// primitive.
#[derive(Clone)]
enum SharedResources {
    CarrierBlocking {
        connections: Arc<[parking_lot::Mutex<()>]>,
        counter: Arc<parking_lot::Mutex<u64>>,
    },
    Cooperative {
        connections: Arc<[tokio::sync::Mutex<()>]>,
        counter: Arc<tokio::sync::Mutex<u64>>,
    },
    Unlocked {
        counter: Arc<AtomicU64>,
    },
}

impl SharedResources {
    fn new(primitive: PrimitiveKind, connections: usize) -> Self {
        match primitive {
            PrimitiveKind::CarrierBlocking => SharedResources::CarrierBlocking {
                connections: (0..connections)
                    .map(|_| parking_lot::Mutex::new(()))
                    .collect(),
                counter: Arc::new(parking_lot::Mutex::new(0)),
            },
            PrimitiveKind::Cooperative => SharedResources::Cooperative {
                connections: (0..connections)
                    .map(|_| tokio::sync::Mutex::new(()))
                    .collect(),
                counter: Arc::new(tokio::sync::Mutex::new(0)),
            },
            PrimitiveKind::Unlocked => SharedResources::Unlocked {
                counter: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    /// Must be called outside of the runtime, once no unit holds the lock.
    fn count(&self) -> u64 {
        match self {
            SharedResources::CarrierBlocking { counter, .. } => *counter.lock(),
            SharedResources::Cooperative { counter, .. } => *counter.blocking_lock(),
            SharedResources::Unlocked { counter } => counter.load(Ordering::Acquire),
        }
    }
}

fn connection_index(id: TaskId, connections: usize) -> usize {
    (id % connections as u64) as usize
}

/// Enter the unit's connection monitor, bump the shared counter, then wait for `hold` without
/// releasing the monitor.
async fn critical_section(
    id: TaskId,
    hold: Duration,
    resources: SharedResources,
    holding: Arc<ConcurrencyGauge>,
) {
    match resources {
        SharedResources::CarrierBlocking {
            connections,
            counter,
        } => {
            // Waiting here blocks the carrier as well as the unit.
            let _monitor = connections[connection_index(id, connections.len())].lock();
            *counter.lock() += 1;

            let _holding = holding.enter();
            // No suspension point until the monitor is released, the carrier is pinned.
            std::thread::sleep(hold);
        }
        SharedResources::Cooperative {
            connections,
            counter,
        } => {
            let _monitor = connections[connection_index(id, connections.len())]
                .lock()
                .await;
            *counter.lock().await += 1;

            let _holding = holding.enter();
            tokio::time::sleep(hold).await;
        }
        SharedResources::Unlocked { counter } => {
            counter.fetch_add(1, Ordering::AcqRel);

            let _holding = holding.enter();
            tokio::time::sleep(hold).await;
        }
    }
}

/// The result of a unit that has left the join set. A unit that panicked or was cancelled is
/// reported as failed.
fn unit_result(
    joined: Result<(task::Id, ExecutionResult), JoinError>,
    unit_ids: &HashMap<task::Id, TaskId>,
) -> Option<ExecutionResult> {
    match joined {
        Ok((_, result)) => Some(result),
        Err(e) => {
            let Some(&id) = unit_ids.get(&e.id()) else {
                log::error!("Unknown hazard unit did not finish: {e}");
                return None;
            };

            log::error!("Hazard unit {id} did not finish: {e}");
            Some(ExecutionResult::new(
                id,
                Err(TaskExecutionFailure::new(id, e.to_string())),
                Duration::ZERO,
            ))
        }
    }
}

/// Run `unit_count` identical critical sections on a lightweight engine's carriers.
///
/// The peak concurrency reported is the number of units seen inside their hold at once. With the
/// carrier-blocking primitive that can never exceed the carrier count.
pub fn run_hazard_scenario(
    config: &HazardConfiguration,
    control: &RunControl,
) -> Result<RunMetrics, ScenarioError> {
    log::info!(
        "Running {} units holding one of {} {} connections for {:?} on {} carriers",
        config.unit_count,
        config.connections,
        config.primitive.label(),
        config.hold,
        config.carriers
    );

    if config.connections == 0 {
        return Err(EngineError::InvalidConfiguration {
            reason: "at least one connection is required".to_string(),
        }
        .into());
    }

    let mut engine = LightweightTaskEngine::new(config.carriers, config.carrier_limit)?;
    let resources = SharedResources::new(config.primitive, config.connections);
    let holding = ConcurrencyGauge::new();
    let mut shutdown_listener = control.shutdown_listener();

    let started = Instant::now();
    let deadline = deadline_after(started, config.timeout);
    let results = engine.runtime()?.block_on(async {
        let mut units = JoinSet::new();
        let mut unit_ids = HashMap::with_capacity(config.unit_count.min(1 << 20) as usize);
        for id in 0..config.unit_count {
            let resources = resources.clone();
            let holding = holding.clone();
            let hold = config.hold;
            let unit = units.spawn(async move {
                let started = Instant::now();
                critical_section(id, hold, resources, holding).await;
                ExecutionResult::new(id, Ok(id), started.elapsed())
            });
            unit_ids.insert(unit.id(), id);
        }

        let mut results = Vec::with_capacity(config.unit_count.min(1 << 20) as usize);
        let timeout = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
        tokio::pin!(timeout);
        let interrupted = shutdown_listener.wait_for_shutdown();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                joined = units.join_next_with_id() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    if let Some(result) = unit_result(joined, &unit_ids) {
                        control.record_completed(1);
                        results.push(result);
                    }

                    // Pinned carriers may not get round to firing the timer below.
                    if Instant::now() >= deadline && !units.is_empty() {
                        log::warn!("Hazard scenario timed out with {} units outstanding", units.len());
                        break;
                    }
                }
                _ = &mut timeout => {
                    log::warn!("Hazard scenario timed out with {} units outstanding", units.len());
                    break;
                }
                _ = &mut interrupted => {
                    log::warn!("Hazard scenario interrupted with {} units outstanding", units.len());
                    break;
                }
            }
        }

        // Dropping the set cancels every unit that has not finished.
        results
    });
    let elapsed = started.elapsed();
    engine.shutdown(config.drain_timeout);

    let mut metrics = aggregate(config.unit_count, &results, elapsed, holding.peak());
    if !metrics.is_complete() {
        if control.interrupted() {
            metrics.completion = Completion::Interrupted;
        }
        return Ok(metrics);
    }

    // A unit that failed may or may not have got as far as the increment.
    let observed = resources.count();
    if metrics.failure_count == 0 && observed != config.unit_count {
        return Err(ScenarioError::LostUpdate {
            expected: config.unit_count,
            observed,
        });
    }

    Ok(metrics)
}
