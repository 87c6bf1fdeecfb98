//! Error types for dispatching and delivering work.

use offload_core::{WorkId, WorkState};

/// Result type for work operations.
pub type Result<T> = std::result::Result<T, WorkError>;

/// Errors raised by executors.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The executor no longer accepts jobs
    #[error("executor is shut down")]
    ShutDown,

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The tokio runtime could not be built
    #[error("failed to build tokio runtime: {0}")]
    Runtime(std::io::Error),
}

/// Errors raised while dispatching work or running the completion loop.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    /// The executor refused the job
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A completion loop was started from inside a continuation
    #[error("completion loop is already running on this thread")]
    ReentrantRun,

    /// A completion arrived for an item that has not finished
    #[error("work item {id} reached the relay in state {state}")]
    NotTerminal {
        /// Item id
        id: WorkId,
        /// State it arrived in
        state: WorkState,
    },

    /// Configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}
