mod shutdown;
mod task;
mod workload;

pub mod prelude {
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
    pub use crate::task::{
        always_ok, fail_every, panic_every, BusinessLogic, ExecutionResult, Task,
        TaskExecutionFailure, TaskId, TaskState,
    };
    pub use crate::workload::{generate, Workload};
}
