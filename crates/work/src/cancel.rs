//! Cooperative cancellation.

use offload_core::{ExecutionFailure, WorkId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep inside [`WorkContext::sleep`].
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Shared cancellation flag for one Work Item.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a work function is allowed to see while it runs.
///
/// Work functions get their own payload and this context, nothing that
/// belongs to the caller.
#[derive(Debug, Clone)]
pub struct WorkContext {
    id: WorkId,
    cancel: CancelToken,
}

impl WorkContext {
    pub(crate) fn new(id: WorkId, cancel: CancelToken) -> Self {
        Self { id, cancel }
    }

    /// Id of the item being run.
    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Whether the caller asked for this work to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Return `Err(Cancelled)` if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), ExecutionFailure> {
        if self.is_cancelled() {
            Err(ExecutionFailure::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking up periodically to observe cancellation.
    ///
    /// Never returns before `duration` has elapsed unless cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), ExecutionFailure> {
        let deadline = Instant::now() + duration;
        loop {
            self.checkpoint()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
