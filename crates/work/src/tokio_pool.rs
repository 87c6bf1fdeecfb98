//! Executor backed by tokio's blocking thread pool.

use crate::error::ExecutorError;
use crate::executor::{Executor, Job, Rejected};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::{Handle, Runtime};
use tracing::debug;

/// Runs jobs with [`tokio::task::spawn_blocking`].
///
/// Either owns a dedicated runtime or borrows an existing one through its
/// [`Handle`]. Dropping an owned runtime waits for running blocking jobs,
/// so the executor must not be dropped from inside async code.
pub struct TokioExecutor {
    name: String,
    workers: usize,
    handle: Handle,
    runtime: Option<Runtime>,
    closed: AtomicBool,
}

impl TokioExecutor {
    /// Build a dedicated runtime with at most `workers` blocking threads.
    pub fn new(workers: usize, thread_name: &str) -> Result<Self, ExecutorError> {
        let workers = workers.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name(thread_name)
            .enable_all()
            .build()
            .map_err(ExecutorError::Runtime)?;

        debug!(workers, "tokio blocking executor started");
        Ok(Self {
            name: thread_name.to_string(),
            workers,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            closed: AtomicBool::new(false),
        })
    }

    /// Use the blocking pool of an existing runtime.
    ///
    /// `workers` should match the runtime's `max_blocking_threads`; it is
    /// only reported, the runtime enforces its own cap.
    pub fn from_handle(handle: Handle, workers: usize) -> Self {
        Self {
            name: "tokio".to_string(),
            workers: workers.max(1),
            handle,
            runtime: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Stop accepting jobs.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether this executor owns its runtime.
    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl Executor for TokioExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn execute(&self, job: Job) -> Result<(), Rejected> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Rejected::new(job, ExecutorError::ShutDown));
        }
        // Completion is reported through the job itself, also when a
        // runtime that is shutting down drops it unrun.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_owned_runtime_runs_jobs() {
        let executor = TokioExecutor::new(2, "offload-test").unwrap();
        assert!(executor.owns_runtime());
        assert_eq!(executor.workers(), 2);

        let (tx, rx) = flume::unbounded();
        let caller = std::thread::current().id();
        executor
            .execute(Box::new(move || tx.send(std::thread::current().id()).unwrap()))
            .unwrap();

        assert_ne!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), caller);
    }

    #[test]
    fn test_borrowed_handle_runs_jobs() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let executor = TokioExecutor::from_handle(runtime.handle().clone(), 3);
        assert!(!executor.owns_runtime());
        assert_eq!(executor.workers(), 3);

        let (tx, rx) = flume::unbounded();
        executor.execute(Box::new(move || tx.send(7).unwrap())).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn test_borrowed_handle_worker_count_is_clamped() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let executor = TokioExecutor::from_handle(runtime.handle().clone(), 0);
        assert_eq!(executor.workers(), 1);
    }

    #[test]
    fn test_rejects_after_shutdown() {
        let executor = TokioExecutor::new(1, "offload-test").unwrap();
        executor.shutdown();
        assert!(matches!(
            executor.execute(Box::new(|| {})),
            Err(Rejected {
                error: ExecutorError::ShutDown,
                ..
            })
        ));
    }
}
