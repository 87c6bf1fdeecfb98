//! The Work Item record threaded between dispatch and completion.

use crate::{ExecutionFailure, Time, TransitionError, WorkId, WorkState};
use serde::{Deserialize, Serialize};

/// A unit of asynchronous work.
///
/// The item is owned by exactly one party at a time: the dispatcher builds
/// it, the executor moves it through `Running` to a terminal state, and the
/// completion relay retires it after the continuation ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem<P> {
    /// Unique id
    pub id: WorkId,

    /// Parameters for the work function
    pub payload: P,

    state: WorkState,

    /// When the item was handed to the executor
    pub submitted_at: Time,

    /// When a worker started it
    pub started_at: Option<Time>,

    /// When it reached a terminal state
    pub finished_at: Option<Time>,

    /// When the continuation finished and the item was retired
    pub retired_at: Option<Time>,

    error: Option<ExecutionFailure>,
}

impl<P> WorkItem<P> {
    /// Create a new item in the `Submitted` state.
    pub fn new(payload: P) -> Self {
        Self {
            id: WorkId::new(),
            payload,
            state: WorkState::Submitted,
            submitted_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
            retired_at: None,
            error: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkState {
        self.state
    }

    /// Failure attached to a failed or cancelled item.
    pub fn error(&self) -> Option<&ExecutionFailure> {
        self.error.as_ref()
    }

    fn transition(&mut self, next: WorkState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// `Submitted → Running`
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(WorkState::Running)?;
        self.started_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// `Running → Completed`
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transition(WorkState::Completed)?;
        self.finished_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// `Running → Failed`, attaching the failure.
    pub fn fail(&mut self, failure: ExecutionFailure) -> Result<(), TransitionError> {
        self.transition(WorkState::Failed)?;
        self.finished_at = Some(chrono::Utc::now());
        self.error = Some(failure);
        Ok(())
    }

    /// `Submitted → Cancelled`, attaching the reason.
    pub fn cancel(&mut self, failure: ExecutionFailure) -> Result<(), TransitionError> {
        self.transition(WorkState::Cancelled)?;
        self.finished_at = Some(chrono::Utc::now());
        self.error = Some(failure);
        Ok(())
    }

    /// Terminal state → `Retired`.
    pub fn retire(&mut self) -> Result<(), TransitionError> {
        self.transition(WorkState::Retired)?;
        self.retired_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Time spent running, once the item finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Payload-free snapshot of the item.
    pub fn summary(&self) -> WorkSummary {
        WorkSummary {
            id: self.id,
            state: self.state,
            submitted_at: self.submitted_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            retired_at: self.retired_at,
            error: self.error.clone(),
        }
    }
}

/// Serializable record of a Work Item without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSummary {
    /// Item id
    pub id: WorkId,
    /// State at the time of the snapshot
    pub state: WorkState,
    /// Submission time
    pub submitted_at: Time,
    /// Start time
    pub started_at: Option<Time>,
    /// Finish time
    pub finished_at: Option<Time>,
    /// Retirement time
    pub retired_at: Option<Time>,
    /// Failure, if any
    pub error: Option<ExecutionFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_item_is_submitted() {
        let item = WorkItem::new(Duration::from_millis(5));
        assert_eq!(item.state(), WorkState::Submitted);
        assert!(item.started_at.is_none());
        assert!(item.error().is_none());
    }

    #[test]
    fn test_successful_lifecycle() {
        let mut item = WorkItem::new(());
        item.start().unwrap();
        item.complete().unwrap();
        assert!(item.state().is_terminal());
        item.retire().unwrap();

        let summary = item.summary();
        assert_eq!(summary.state, WorkState::Retired);
        assert!(summary.submitted_at <= summary.started_at.unwrap());
        assert!(summary.started_at.unwrap() <= summary.finished_at.unwrap());
        assert!(summary.finished_at.unwrap() <= summary.retired_at.unwrap());
        assert!(item.elapsed().is_some());
    }

    #[test]
    fn test_failure_is_attached() {
        let mut item = WorkItem::new(());
        item.start().unwrap();
        item.fail(ExecutionFailure::Interrupted("signal".into())).unwrap();
        assert_eq!(item.state(), WorkState::Failed);
        assert_eq!(
            item.error(),
            Some(&ExecutionFailure::Interrupted("signal".into()))
        );
    }

    #[test]
    fn test_cancel_only_before_running() {
        let mut item = WorkItem::new(());
        item.cancel(ExecutionFailure::Cancelled).unwrap();
        assert_eq!(item.state(), WorkState::Cancelled);
        assert!(item.started_at.is_none());

        let mut running = WorkItem::new(());
        running.start().unwrap();
        let err = running.cancel(ExecutionFailure::Cancelled).unwrap_err();
        assert_eq!(err.from, WorkState::Running);
        assert_eq!(err.to, WorkState::Cancelled);
        assert_eq!(running.state(), WorkState::Running);
    }

    #[test]
    fn test_illegal_transition_leaves_item_untouched() {
        let mut item = WorkItem::new(());
        assert!(item.complete().is_err());
        assert!(item.retire().is_err());
        assert_eq!(item.state(), WorkState::Submitted);
        assert!(item.finished_at.is_none());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut item = WorkItem::new(());
        item.start().unwrap();
        assert!(item.start().is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let mut item = WorkItem::new(7u32);
        item.start().unwrap();
        item.fail(ExecutionFailure::Failed("nope".into())).unwrap();
        let json = serde_json::to_value(item.summary()).unwrap();
        assert_eq!(json["state"], "Failed");
        assert!(json.get("payload").is_none());
    }
}
