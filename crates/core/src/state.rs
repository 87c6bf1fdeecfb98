//! Work Item lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a Work Item.
///
/// ```text
/// Submitted → Running → Completed ┐
///     │           └───→ Failed    ├→ Retired
///     └──────────────→ Cancelled  ┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkState {
    /// Handed to the executor, not yet picked up by a worker
    Submitted,
    /// A worker is running the work function
    Running,
    /// The work function returned successfully
    Completed,
    /// The work function returned an error or panicked
    Failed,
    /// Cancelled or rejected before a worker started it
    Cancelled,
    /// The continuation has run and the item is finished with
    Retired,
}

impl WorkState {
    /// Whether the item is finished and ready for its continuation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: WorkState) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Running)
                | (Self::Submitted, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Completed, Self::Retired)
                | (Self::Failed, Self::Retired)
                | (Self::Cancelled, Self::Retired)
        )
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkState::Submitted => write!(f, "submitted"),
            WorkState::Running => write!(f, "running"),
            WorkState::Completed => write!(f, "completed"),
            WorkState::Failed => write!(f, "failed"),
            WorkState::Cancelled => write!(f, "cancelled"),
            WorkState::Retired => write!(f, "retired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!WorkState::Submitted.is_terminal());
        assert!(!WorkState::Running.is_terminal());
        assert!(WorkState::Completed.is_terminal());
        assert!(WorkState::Failed.is_terminal());
        assert!(WorkState::Cancelled.is_terminal());
        assert!(!WorkState::Retired.is_terminal());
    }

    #[test]
    fn test_no_state_is_skipped() {
        assert!(!WorkState::Submitted.can_transition_to(WorkState::Completed));
        assert!(!WorkState::Submitted.can_transition_to(WorkState::Retired));
        assert!(!WorkState::Running.can_transition_to(WorkState::Retired));
        assert!(!WorkState::Running.can_transition_to(WorkState::Cancelled));
    }

    #[test]
    fn test_no_transition_runs_twice() {
        assert!(!WorkState::Running.can_transition_to(WorkState::Running));
        assert!(!WorkState::Completed.can_transition_to(WorkState::Completed));
        assert!(!WorkState::Retired.can_transition_to(WorkState::Retired));
        assert!(!WorkState::Completed.can_transition_to(WorkState::Running));
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkState::Submitted.to_string(), "submitted");
        assert_eq!(WorkState::Retired.to_string(), "retired");
    }
}
