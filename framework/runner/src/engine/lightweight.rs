use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Runtime;

use carrier_bench_core::prelude::{ExecutionResult, Task, TaskState};
use carrier_bench_instruments::ConcurrencyGauge;

use crate::control::RunControl;
use crate::engine::{
    check_capacity, collect_from, EngineError, EngineKind, ExecutionEngine, TaskHandle,
    MAX_DEADLINE_OFFSET,
};

/// The default carrier count: one per core the process may run on.
pub fn default_carriers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Build a multi-threaded runtime whose worker threads are the carriers.
fn carrier_runtime(carriers: usize, limit: usize) -> Result<Runtime, EngineError> {
    check_capacity("carrier", carriers, limit)?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(carriers)
        .thread_name("carrier")
        .enable_all()
        .build()
        .map_err(|e| EngineError::ResourceExhaustion {
            resource: "carrier",
            requested: carriers,
            limit,
            reason: e.to_string(),
        })
}

/// One tokio task per submitted [Task], multiplexed over a small number of carrier threads.
///
/// A unit awaiting its simulated wait is parked in the runtime's timer, not on a carrier, so the
/// number of live units is bounded only by memory.
pub struct LightweightTaskEngine {
    runtime: Option<Runtime>,
    carriers: usize,
    result_sender: Sender<ExecutionResult>,
    results: Receiver<ExecutionResult>,
    gauge: Arc<ConcurrencyGauge>,
    submitted: u64,
}

impl LightweightTaskEngine {
    pub fn new(carriers: usize, limit: usize) -> Result<Self, EngineError> {
        let runtime = carrier_runtime(carriers, limit)?;
        let (result_sender, results) = crossbeam_channel::unbounded();

        log::debug!("Started lightweight engine with {carriers} carriers");
        Ok(Self {
            runtime: Some(runtime),
            carriers,
            result_sender,
            results,
            gauge: ConcurrencyGauge::new(),
            submitted: 0,
        })
    }

    pub fn carrier_count(&self) -> usize {
        self.carriers
    }

    /// The carrier runtime, for driving units that are not plain [Task]s.
    pub(crate) fn runtime(&self) -> Result<&Runtime, EngineError> {
        self.runtime.as_ref().ok_or(EngineError::ShutDown)
    }
}

impl ExecutionEngine for LightweightTaskEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Lightweight
    }

    fn submit(&mut self, task: Task) -> Result<TaskHandle, EngineError> {
        let runtime = self.runtime()?;
        let task_id = task.id();
        log::trace!("task {task_id} {:?}", TaskState::Submitted);

        let results = self.result_sender.clone();
        // Counted from submission, a unit is live for as long as it exists.
        let live = self.gauge.enter();
        runtime.spawn(async move {
            let _live = live;
            let started = Instant::now();
            log::trace!("task {} {:?}", task.id(), TaskState::Running);

            if !task.delay().is_zero() {
                log::trace!("task {} {:?}", task.id(), TaskState::Suspended);
                // Awaiting hands the carrier back until the timer fires.
                tokio::time::sleep(task.delay()).await;
                log::trace!("task {} {:?}", task.id(), TaskState::Running);
            }

            let outcome = task.complete();
            let result = ExecutionResult::new(task.id(), outcome, started.elapsed());
            log::trace!("task {} {:?}", task.id(), result.state());

            // The receiver is gone only once the engine has been dropped.
            let _ = results.send(result);
        });

        let handle = TaskHandle {
            task_id,
            sequence: self.submitted,
        };
        self.submitted += 1;
        Ok(handle)
    }

    fn collect(
        &mut self,
        expected: u64,
        deadline: Instant,
        control: &RunControl,
    ) -> Vec<ExecutionResult> {
        collect_from(&self.results, expected, deadline, control)
    }

    fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    fn shutdown(&mut self, drain_timeout: Duration) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        // Pending units are dropped at their current suspension point. Carriers still blocked
        // after the drain window are left to finish on their own.
        let outstanding = self.gauge.current();
        runtime.shutdown_timeout(drain_timeout.min(MAX_DEADLINE_OFFSET));
        log::debug!("Lightweight engine shut down with {outstanding} units still live");
    }
}

impl Drop for LightweightTaskEngine {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_bench_core::prelude::{always_ok, generate};

    #[test]
    fn exhaustion_when_over_limit() {
        assert!(matches!(
            LightweightTaskEngine::new(64, 8),
            Err(EngineError::ResourceExhaustion { requested: 64, limit: 8, .. })
        ));
    }

    #[test]
    fn default_carriers_is_positive() {
        assert!(default_carriers() >= 1);
    }

    #[test]
    fn shutdown_cancels_waiting_units() {
        let mut engine = LightweightTaskEngine::new(2, 16).unwrap();
        for task in generate(1000, Duration::from_secs(60), always_ok()) {
            engine.submit(task).unwrap();
        }
        assert_eq!(1000, engine.peak_concurrency());

        let started = Instant::now();
        engine.shutdown(Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(5));

        let task = generate(1, Duration::ZERO, always_ok()).next().unwrap();
        assert_eq!(Err(EngineError::ShutDown), engine.submit(task));
    }
}
