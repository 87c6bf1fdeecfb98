//! Work offloading (Layer 2)
//!
//! Runs blocking work on background threads and delivers each result to a
//! continuation on the thread that submitted it.
//!
//! ```text
//! Dispatcher ──job──▶ Executor (worker thread)
//!     ▲                    │
//!     │               completion
//!     │                    ▼
//! ExecutionContext ◀── channel ── CompletionRelay ──▶ continuation
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod pool;
pub mod tokio_pool;
mod relay;

pub use cancel::{CancelToken, WorkContext};
pub use config::{Backend, ContextConfig, ExecutorConfig};
pub use context::ExecutionContext;
pub use dispatcher::{run_blocking, Dispatcher, WorkHandle};
pub use error::{ExecutorError, WorkError};
pub use executor::{Executor, Job, Rejected};
pub use pool::ThreadPool;
pub use tokio_pool::TokioExecutor;
