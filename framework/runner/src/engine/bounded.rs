use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use carrier_bench_core::prelude::{
    DelegatedShutdownListener, ExecutionResult, ShutdownHandle, Task, TaskState,
};
use carrier_bench_instruments::ConcurrencyGauge;

use crate::control::RunControl;
use crate::engine::{
    check_capacity, collect_from, deadline_after, EngineError, EngineKind, ExecutionEngine,
    TaskHandle,
};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A fixed number of OS threads pulling tasks from a shared FIFO queue.
///
/// Each worker runs one task at a time and stays occupied for the whole of that task's simulated
/// wait, so no more than `workers` tasks are ever running.
pub struct BoundedWorkerPoolEngine {
    queue: Option<Sender<Task>>,
    results: Receiver<ExecutionResult>,
    workers: Vec<JoinHandle<()>>,
    gauge: Arc<ConcurrencyGauge>,
    shutdown_handle: ShutdownHandle,
    submitted: u64,
}

impl BoundedWorkerPoolEngine {
    /// Start `workers` threads, each with a stack of `stack_size` bytes.
    ///
    /// Fails with [EngineError::ResourceExhaustion] if `workers` is over `limit` or if the operating
    /// system refuses to create a thread. Threads that were already started are stopped again
    /// before returning the error.
    pub fn new(workers: usize, stack_size: usize, limit: usize) -> Result<Self, EngineError> {
        check_capacity("worker", workers, limit)?;

        // Workers compete for tasks on a single queue, in submission order.
        let (queue, queue_receiver) = crossbeam_channel::unbounded::<Task>();
        let (result_sender, results) = crossbeam_channel::unbounded();
        let gauge = ConcurrencyGauge::new();
        let shutdown_handle = ShutdownHandle::new();

        let mut engine = Self {
            queue: Some(queue),
            results,
            workers: Vec::with_capacity(workers),
            gauge,
            shutdown_handle,
            submitted: 0,
        };

        for index in 0..workers {
            let queue_receiver = queue_receiver.clone();
            let result_sender = result_sender.clone();
            let gauge = engine.gauge.clone();
            let shutdown_listener = engine.shutdown_handle.new_listener();

            let spawned = thread::Builder::new()
                .name(format!("pool-worker-{index}"))
                .stack_size(stack_size)
                .spawn(move || {
                    worker_loop(queue_receiver, result_sender, gauge, shutdown_listener)
                });

            match spawned {
                Ok(handle) => engine.workers.push(handle),
                Err(e) => {
                    log::error!("Failed to start pool worker {index} of {workers}: {e}");
                    engine.shutdown(Duration::from_secs(1));
                    return Err(EngineError::ResourceExhaustion {
                        resource: "worker",
                        requested: workers,
                        limit,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!("Started bounded pool with {workers} workers");
        Ok(engine)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(
    queue: Receiver<Task>,
    results: Sender<ExecutionResult>,
    gauge: Arc<ConcurrencyGauge>,
    shutdown_listener: DelegatedShutdownListener,
) {
    for task in queue.iter() {
        if shutdown_listener.should_shutdown() {
            log::trace!("Discarding queued task {} during shutdown", task.id());
            continue;
        }

        let _running = gauge.enter();
        let started = Instant::now();
        log::trace!("task {} {:?}", task.id(), TaskState::Running);

        if !task.delay().is_zero() {
            log::trace!("task {} {:?}", task.id(), TaskState::Suspended);
            // The worker stays parked in the kernel for the whole wait.
            thread::sleep(task.delay());
            log::trace!("task {} {:?}", task.id(), TaskState::Running);
        }

        let outcome = task.complete();
        let result = ExecutionResult::new(task.id(), outcome, started.elapsed());
        log::trace!("task {} {:?}", task.id(), result.state());

        if results.send(result).is_err() {
            // Nobody is collecting any more, the engine is being torn down.
            break;
        }
    }
}

impl ExecutionEngine for BoundedWorkerPoolEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::BoundedPool
    }

    fn submit(&mut self, task: Task) -> Result<TaskHandle, EngineError> {
        let queue = self.queue.as_ref().ok_or(EngineError::ShutDown)?;
        let task_id = task.id();
        log::trace!("task {task_id} {:?}", TaskState::Submitted);
        queue.send(task).map_err(|_| EngineError::ShutDown)?;

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
        if self.queue.is_none() && self.workers.is_empty() {
            return;
        }

        // Workers discard whatever is still queued, then see the closed queue and exit.
        self.shutdown_handle.shutdown();
        drop(self.queue.take());

        let deadline = deadline_after(Instant::now(), drain_timeout);
        let mut detached = 0;
        for handle in self.workers.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(DRAIN_POLL_INTERVAL);
            }

            if handle.is_finished() {
                if handle.join().is_err() {
                    log::error!("A pool worker panicked");
                }
            } else {
                detached += 1;
            }
        }

        if detached > 0 {
            log::warn!(
                "Detached {detached} pool workers still busy after the {drain_timeout:?} drain window"
            );
        } else {
            log::debug!("All pool workers stopped");
        }
    }
}

impl Drop for BoundedWorkerPoolEngine {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}
