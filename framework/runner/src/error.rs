use carrier_bench_core::prelude::ShutdownSignalError;

use crate::engine::EngineError;

/// Why a single scenario did not produce metrics.
///
/// None of these stop the remaining scenarios of a run.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub enum ScenarioError {
    #[display("{_0}")]
    Engine(#[error(source)] EngineError),
    #[display("shared counter lost updates: expected {expected}, observed {observed}")]
    LostUpdate { expected: u64, observed: u64 },
    #[display("{_0}")]
    Cancelled(#[error(source)] ShutdownSignalError),
}

impl From<EngineError> for ScenarioError {
    fn from(value: EngineError) -> Self {
        ScenarioError::Engine(value)
    }
}

impl From<ShutdownSignalError> for ScenarioError {
    fn from(value: ShutdownSignalError) -> Self {
        ScenarioError::Cancelled(value)
    }
}
