//! offload core data models.
//!
//! This crate defines the Work Item that carries a pending unit of
//! background work from the dispatcher, through the executor, to the
//! completion relay, together with its lifecycle states and failures.

#![warn(missing_docs)]

// Core identities
mod id;

// Work lifecycle
mod state;
mod work_item;
mod failure;

// Re-exports
pub use id::*;

pub use state::WorkState;
pub use work_item::{WorkItem, WorkSummary};
pub use failure::{ExecutionFailure, TransitionError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
