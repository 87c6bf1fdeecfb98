//! Executor and execution-context configuration.

use crate::error::{Result, WorkError};
use crate::executor::Executor;
use crate::pool::{ThreadPool, DEFAULT_THREAD_NAME};
use crate::tokio_pool::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Environment variable overriding the worker count.
pub const WORKERS_ENV: &str = "OFFLOAD_WORKERS";

/// Environment variable overriding the backend.
pub const BACKEND_ENV: &str = "OFFLOAD_BACKEND";

/// Which thread pool runs the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Dedicated OS threads ([`ThreadPool`])
    #[default]
    ThreadPool,
    /// tokio's blocking pool ([`TokioExecutor`])
    Tokio,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::ThreadPool => write!(f, "thread-pool"),
            Backend::Tokio => write!(f, "tokio"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = WorkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "thread-pool" | "threadpool" | "pool" => Ok(Backend::ThreadPool),
            "tokio" => Ok(Backend::Tokio),
            other => Err(WorkError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Configuration for building an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker threads (clamped to at least 1)
    pub workers: usize,
    /// Thread name prefix
    pub thread_name: String,
    /// Pool implementation
    pub backend: Backend,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            backend: Backend::default(),
        }
    }
}

impl ExecutorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| WorkError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `OFFLOAD_WORKERS` / `OFFLOAD_BACKEND` from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(workers) = lookup(WORKERS_ENV) {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|e| WorkError::Config(format!("{WORKERS_ENV}={workers}: {e}")))?;
        }
        if let Some(backend) = lookup(BACKEND_ENV) {
            self.backend = backend.parse()?;
        }
        Ok(self)
    }

    /// Build the configured executor.
    pub fn build(&self) -> Result<Arc<dyn Executor>> {
        let workers = self.workers.max(1);
        let executor: Arc<dyn Executor> = match self.backend {
            Backend::ThreadPool => Arc::new(ThreadPool::with_name(workers, &self.thread_name)?),
            Backend::Tokio => Arc::new(TokioExecutor::new(workers, &self.thread_name)?),
        };
        Ok(executor)
    }
}

/// Configuration for an [`ExecutionContext`](crate::ExecutionContext).
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Retired summaries kept for [`take_history`](crate::ExecutionContext::take_history)
    pub history_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: 1024,
        }
    }
}
