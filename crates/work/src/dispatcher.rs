//! Synchronous entry points for offloading work.

use crate::cancel::{CancelToken, WorkContext};
use crate::context::{Pending, Shared};
use crate::error::Result;
use crate::executor::{run_item, Finished, Rejected, Submission};
use crate::relay;
use offload_core::{ExecutionFailure, WorkId, WorkItem, WorkSummary};
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Submits work on behalf of one [`ExecutionContext`](crate::ExecutionContext).
///
/// Cheap to clone; bound to the caller's thread.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Rc<Shared>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    /// Offload `work` and return immediately.
    ///
    /// `work` runs on an executor thread with its payload and a
    /// [`WorkContext`]. `continuation` stays on this thread and is invoked
    /// exactly once, by the owning context's loop, with the work's result.
    ///
    /// If the executor refuses the job the error is returned here and no
    /// continuation is kept.
    pub fn submit<P, T, W, C>(&self, payload: P, work: W, continuation: C) -> Result<WorkHandle>
    where
        P: Send + 'static,
        T: Send + 'static,
        W: FnOnce(&P, &WorkContext) -> std::result::Result<T, ExecutionFailure> + Send + 'static,
        C: FnOnce(std::result::Result<T, ExecutionFailure>) + 'static,
    {
        let item = WorkItem::new(payload);
        let id = item.id;
        let cancel = CancelToken::new();

        let (job, disarm) =
            Submission::new(item, work, cancel.clone(), self.shared.completions.clone()).into_job();
        if let Err(Rejected { job, error }) = self.shared.executor.execute(job) {
            // The caller gets the error; nothing may reach the relay.
            disarm.disarm();
            drop(job);
            warn!(%id, %error, "executor refused work");
            return Err(error.into());
        }

        // Completions are only read on this thread, so registering after
        // the hand-off cannot race with delivery.
        self.shared.pending.borrow_mut().insert(
            id,
            Pending {
                continuation: relay::erase::<P, T, C>(continuation),
                cancel: cancel.clone(),
            },
        );
        debug!(%id, executor = self.shared.executor.name(), "work submitted");

        Ok(WorkHandle { id, cancel })
    }

    /// Items submitted through this context that have not been delivered.
    pub fn pending(&self) -> usize {
        self.shared.pending.borrow().len()
    }
}

/// Run `work` inline and invoke `continuation` before returning.
///
/// The blocking sibling of [`Dispatcher::submit`]: same lifecycle, same
/// failure handling, but the caller's thread is occupied for the whole run.
pub fn run_blocking<P, T, W, C>(payload: P, work: W, continuation: C) -> WorkSummary
where
    W: FnOnce(&P, &WorkContext) -> std::result::Result<T, ExecutionFailure>,
    C: FnOnce(std::result::Result<T, ExecutionFailure>),
{
    let item = WorkItem::new(payload);
    let Finished { mut item, output } = run_item(item, &CancelToken::new(), work);

    continuation(output);

    if let Err(err) = item.retire() {
        error!(%err, "failed to retire work item");
    }
    item.summary()
}

/// Handle to submitted work.
#[derive(Debug, Clone)]
pub struct WorkHandle {
    id: WorkId,
    cancel: CancelToken,
}

impl WorkHandle {
    /// Id of the submitted item.
    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Request cancellation.
    ///
    /// Guaranteed to take effect if no worker has started the item yet;
    /// otherwise it is up to the work function to notice.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::WorkState;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    #[test]
    fn test_run_blocking_waits_and_calls_back_before_returning() {
        let fired = Cell::new(0);
        let start = Instant::now();

        let summary = run_blocking(
            Duration::from_millis(30),
            |d: &Duration, ctx: &WorkContext| ctx.sleep(*d),
            |result| {
                assert!(result.is_ok());
                fired.set(fired.get() + 1);
            },
        );

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(fired.get(), 1);
        assert_eq!(summary.state, WorkState::Retired);
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_run_blocking_runs_on_the_calling_thread() {
        let caller = std::thread::current().id();
        let mut ran_on = None;
        run_blocking(
            (),
            |_: &(), _: &WorkContext| Ok(std::thread::current().id()),
            |result| ran_on = result.ok(),
        );
        assert_eq!(ran_on, Some(caller));
    }

    #[test]
    fn test_run_blocking_reports_failure() {
        let mut seen = None;
        let summary = run_blocking(
            (),
            |_: &(), _: &WorkContext| -> std::result::Result<(), ExecutionFailure> {
                Err(ExecutionFailure::Failed("bad input".into()))
            },
            |result| seen = Some(result),
        );
        assert_eq!(seen, Some(Err(ExecutionFailure::Failed("bad input".into()))));
        assert_eq!(summary.error, Some(ExecutionFailure::Failed("bad input".into())));
    }

    #[test]
    fn test_handle_cancel_flag() {
        let handle = WorkHandle {
            id: WorkId::new(),
            cancel: CancelToken::new(),
        };
        assert!(!handle.is_cancelled());
        handle.clone().cancel();
        assert!(handle.is_cancelled());
    }
}
