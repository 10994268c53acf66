use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub type TaskId = u64;

/// Pure business logic run by a task once its simulated wait has completed.
///
/// The logic receives the task id and produces a value. Returning an error, or panicking, marks
/// only that task as failed.
pub type BusinessLogic = Arc<dyn Fn(TaskId) -> anyhow::Result<u64> + Send + Sync>;

/// A unit of simulated blocking work.
///
/// Cloning a task shares its business logic rather than copying it.
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    delay: Duration,
    logic: BusinessLogic,
}

impl Task {
    pub fn new(id: TaskId, delay: Duration, logic: BusinessLogic) -> Self {
        Self { id, delay, logic }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// How long the task spends in its simulated I/O wait.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run the business logic for this task.
    ///
    /// Errors and panics raised by the logic are captured and turned into a
    /// [TaskExecutionFailure] so that they never escape into the engine running the task.
    pub fn complete(&self) -> Result<u64, TaskExecutionFailure> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| (self.logic)(self.id))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TaskExecutionFailure::new(self.id, format!("{e:#}"))),
            Err(panic) => Err(TaskExecutionFailure::new(
                self.id,
                format!("business logic panicked: {}", panic_message(&*panic)),
            )),
        }
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Lifecycle of a task inside an execution engine.
///
/// `Submitted -> Running -> {Suspended <-> Running}* -> Completed | Failed`
///
/// What `Suspended` costs depends on the engine. A pooled worker stays occupied while its task is
/// suspended, a lightweight unit gives its carrier back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Running,
    Suspended,
    Completed,
    Failed,
}

/// Recorded when a task's business logic returns an error or panics.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("task {task_id} failed: {msg}")]
pub struct TaskExecutionFailure {
    task_id: TaskId,
    msg: String,
}

impl TaskExecutionFailure {
    pub fn new(task_id: TaskId, msg: impl Into<String>) -> Self {
        Self {
            task_id,
            msg: msg.into(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// The outcome of running exactly one [Task].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub id: TaskId,
    pub outcome: Result<u64, TaskExecutionFailure>,
    /// Time from the task starting to run until its business logic returned.
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn new(id: TaskId, outcome: Result<u64, TaskExecutionFailure>, elapsed: Duration) -> Self {
        Self {
            id,
            outcome,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<u64> {
        self.outcome.as_ref().ok().copied()
    }

    /// The terminal state this result represents.
    pub fn state(&self) -> TaskState {
        if self.is_success() {
            TaskState::Completed
        } else {
            TaskState::Failed
        }
    }
}

/// Business logic that always succeeds, echoing the task id.
pub fn always_ok() -> BusinessLogic {
    Arc::new(|id: TaskId| -> anyhow::Result<u64> { Ok(id) })
}

/// Business logic that fails for every task id that is a multiple of `n`.
///
/// `n == 0` never fails.
pub fn fail_every(n: u64) -> BusinessLogic {
    Arc::new(move |id: TaskId| -> anyhow::Result<u64> {
        if n != 0 && id % n == 0 {
            anyhow::bail!("simulated failure for task {id}");
        }
        Ok(id)
    })
}

/// Business logic that panics for every task id that is a multiple of `n`.
///
/// `n == 0` never panics.
pub fn panic_every(n: u64) -> BusinessLogic {
    Arc::new(move |id: TaskId| -> anyhow::Result<u64> {
        if n != 0 && id % n == 0 {
            panic!("simulated panic for task {id}");
        }
        Ok(id)
    })
}
