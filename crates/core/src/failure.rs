//! Failure taxonomy for background work.

use crate::{WorkId, WorkState};
use serde::{Deserialize, Serialize};

/// Why a Work Item did not complete.
///
/// Carried by the item in its terminal state and handed to the continuation,
/// so faults on a worker thread always reach the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ExecutionFailure {
    /// Cancellation was observed
    #[error("work was cancelled")]
    Cancelled,

    /// The work function was interrupted
    #[error("work was interrupted: {0}")]
    Interrupted(String),

    /// The work function panicked
    #[error("work panicked: {0}")]
    Panicked(String),

    /// The work function returned an error
    #[error("work failed: {0}")]
    Failed(String),

    /// The executor dropped the work without running it
    #[error("work was rejected: {0}")]
    Rejected(String),
}

impl ExecutionFailure {
    /// Build a failure from a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// An illegal Work Item state transition was attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("work item {id} cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Item the transition was attempted on
    pub id: WorkId,
    /// State the item is in
    pub from: WorkState,
    /// State that was requested
    pub to: WorkState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_str() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            ExecutionFailure::from_panic(payload.as_ref()),
            ExecutionFailure::Panicked("boom".to_string())
        );
    }

    #[test]
    fn test_from_panic_string() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(format!("bad {}", 7));
        assert_eq!(
            ExecutionFailure::from_panic(payload.as_ref()),
            ExecutionFailure::Panicked("bad 7".to_string())
        );
    }

    #[test]
    fn test_from_panic_other() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert!(matches!(
            ExecutionFailure::from_panic(payload.as_ref()),
            ExecutionFailure::Panicked(_)
        ));
    }

    #[test]
    fn test_transition_error_message() {
        let err = TransitionError {
            id: WorkId::new(),
            from: WorkState::Submitted,
            to: WorkState::Retired,
        };
        assert!(err.to_string().ends_with("cannot move from submitted to retired"));
    }
}
