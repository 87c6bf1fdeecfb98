//! Background execution of Work Items.

use crate::cancel::{CancelToken, WorkContext};
use crate::error::ExecutorError;
use crate::relay::Completion;
use offload_core::{ExecutionFailure, WorkItem};
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A type-erased unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A job the executor refused, handed back unrun.
pub struct Rejected {
    /// The refused job
    pub job: Job,
    /// Why it was refused
    pub error: ExecutorError,
}

impl Rejected {
    /// Refuse `job` with `error`.
    pub fn new(job: Job, error: ExecutorError) -> Self {
        Self { job, error }
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").field("error", &self.error).finish_non_exhaustive()
    }
}

/// Thread-pool abstraction that runs jobs off the caller's thread.
pub trait Executor: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Number of worker threads available for blocking work.
    fn workers(&self) -> usize;

    /// Queue a job. Must not block the caller.
    ///
    /// A job refused up front is returned in [`Rejected`] rather than
    /// dropped. A job accepted here and dropped later is reported through
    /// the job itself.
    fn execute(&self, job: Job) -> Result<(), Rejected>;
}

/// A Work Item in its terminal state together with the work function's output.
pub(crate) struct Finished<P, T> {
    pub(crate) item: WorkItem<P>,
    pub(crate) output: Result<T, ExecutionFailure>,
}

/// Drive one item through `Submitted → Running → {Completed, Failed}`,
/// or straight to `Cancelled` if cancellation arrived first.
pub(crate) fn run_item<P, T, W>(mut item: WorkItem<P>, cancel: &CancelToken, work: W) -> Finished<P, T>
where
    W: FnOnce(&P, &WorkContext) -> Result<T, ExecutionFailure>,
{
    if cancel.is_cancelled() {
        if let Err(err) = item.cancel(ExecutionFailure::Cancelled) {
            error!(%err, "failed to cancel work item");
        }
        debug!(id = %item.id, "work cancelled before start");
        return Finished {
            item,
            output: Err(ExecutionFailure::Cancelled),
        };
    }

    if let Err(err) = item.start() {
        error!(%err, "failed to start work item");
        return Finished {
            item,
            output: Err(ExecutionFailure::Rejected(err.to_string())),
        };
    }
    debug!(id = %item.id, "work started");

    let ctx = WorkContext::new(item.id, cancel.clone());
    let output = match panic::catch_unwind(AssertUnwindSafe(|| work(&item.payload, &ctx))) {
        Ok(result) => result,
        Err(payload) => {
            let failure = ExecutionFailure::from_panic(payload.as_ref());
            warn!(id = %item.id, %failure, "work function panicked");
            Err(failure)
        }
    };

    let transition = match &output {
        Ok(_) => item.complete(),
        Err(failure) => item.fail(failure.clone()),
    };
    if let Err(err) = transition {
        error!(%err, "failed to finish work item");
    }
    debug!(id = %item.id, state = %item.state(), "work finished");

    Finished { item, output }
}

/// A submitted item and its work function, waiting for a worker.
///
/// If the executor drops the job without running it, the item is cancelled
/// with [`ExecutionFailure::Rejected`] and still sent to the relay, unless
/// the submission was disarmed first.
pub(crate) struct Submission<P, T, W>
where
    P: Send + 'static,
    T: Send + 'static,
    W: FnOnce(&P, &WorkContext) -> Result<T, ExecutionFailure> + Send + 'static,
{
    item: Option<WorkItem<P>>,
    work: Option<W>,
    cancel: CancelToken,
    completions: flume::Sender<Completion>,
    disarmed: Arc<AtomicBool>,
    _output: PhantomData<fn() -> T>,
}

/// Silences the drop report of a job its executor handed back.
pub(crate) struct Disarm(Arc<AtomicBool>);

impl Disarm {
    pub(crate) fn disarm(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl<P, T, W> Submission<P, T, W>
where
    P: Send + 'static,
    T: Send + 'static,
    W: FnOnce(&P, &WorkContext) -> Result<T, ExecutionFailure> + Send + 'static,
{
    pub(crate) fn new(
        item: WorkItem<P>,
        work: W,
        cancel: CancelToken,
        completions: flume::Sender<Completion>,
    ) -> Self {
        Self {
            item: Some(item),
            work: Some(work),
            cancel,
            completions,
            disarmed: Arc::new(AtomicBool::new(false)),
            _output: PhantomData,
        }
    }

    pub(crate) fn into_job(self) -> (Job, Disarm) {
        let disarm = Disarm(self.disarmed.clone());
        (Box::new(move || self.run()), disarm)
    }

    fn run(mut self) {
        let (Some(item), Some(work)) = (self.item.take(), self.work.take()) else {
            return;
        };
        let finished = run_item(item, &self.cancel, work);
        Completion::send(&self.completions, finished);
    }
}

impl<P, T, W> Drop for Submission<P, T, W>
where
    P: Send + 'static,
    T: Send + 'static,
    W: FnOnce(&P, &WorkContext) -> Result<T, ExecutionFailure> + Send + 'static,
{
    fn drop(&mut self) {
        let Some(mut item) = self.item.take() else {
            return;
        };
        if self.disarmed.load(Ordering::Acquire) {
            debug!(id = %item.id, "refused work discarded");
            return;
        }
        let failure =
            ExecutionFailure::Rejected("executor dropped the job before running it".to_string());
        if let Err(err) = item.cancel(failure.clone()) {
            error!(%err, "failed to reject work item");
        }
        warn!(id = %item.id, "executor dropped work without running it");
        Completion::send(
            &self.completions,
            Finished::<P, T> {
                item,
                output: Err(failure),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::WorkState;
    use std::time::Duration;

    #[test]
    fn test_run_item_completes() {
        let item = WorkItem::new(21u32);
        let finished = run_item(item, &CancelToken::new(), |n: &u32, _ctx: &WorkContext| Ok(n * 2));
        assert_eq!(finished.item.state(), WorkState::Completed);
        assert_eq!(finished.output, Ok(42));
        assert!(finished.item.started_at.is_some());
    }

    #[test]
    fn test_run_item_sleeps_for_payload() {
        let item = WorkItem::new(Duration::from_millis(15));
        let start = std::time::Instant::now();
        let finished = run_item(item, &CancelToken::new(), |d: &Duration, ctx: &WorkContext| {
            ctx.sleep(*d)
        });
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(finished.item.state(), WorkState::Completed);
    }

    #[test]
    fn test_run_item_records_failure() {
        let item = WorkItem::new(());
        let finished: Finished<(), ()> = run_item(item, &CancelToken::new(), |_: &(), _: &WorkContext| {
            Err(ExecutionFailure::Failed("disk full".into()))
        });
        assert_eq!(finished.item.state(), WorkState::Failed);
        assert_eq!(
            finished.item.error(),
            Some(&ExecutionFailure::Failed("disk full".into()))
        );
    }

    #[test]
    fn test_run_item_catches_panic() {
        let item = WorkItem::new(());
        let finished: Finished<(), ()> =
            run_item(item, &CancelToken::new(), |_: &(), _: &WorkContext| panic!("boom"));
        assert_eq!(finished.item.state(), WorkState::Failed);
        assert_eq!(finished.output, Err(ExecutionFailure::Panicked("boom".into())));
    }

    #[test]
    fn test_run_item_skips_cancelled_work() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut ran = false;
        let finished: Finished<(), ()> = run_item(WorkItem::new(()), &cancel, |_: &(), _: &WorkContext| {
            ran = true;
            Ok(())
        });
        assert!(!ran);
        assert_eq!(finished.item.state(), WorkState::Cancelled);
        assert!(finished.item.started_at.is_none());
        assert_eq!(finished.output, Err(ExecutionFailure::Cancelled));
    }

    #[test]
    fn test_dropped_submission_reports_rejection() {
        let (tx, rx) = flume::unbounded();
        let submission = Submission::new(
            WorkItem::new(()),
            |_: &(), _: &WorkContext| Ok::<(), ExecutionFailure>(()),
            CancelToken::new(),
            tx,
        );
        let (job, _disarm) = submission.into_job();
        drop(job);

        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.state, WorkState::Cancelled);
    }

    #[test]
    fn test_disarmed_submission_reports_nothing() {
        let (tx, rx) = flume::unbounded();
        let (job, disarm) = Submission::new(
            WorkItem::new(()),
            |_: &(), _: &WorkContext| Ok::<(), ExecutionFailure>(()),
            CancelToken::new(),
            tx,
        )
        .into_job();
        disarm.disarm();
        drop(job);

        assert!(rx.is_empty());
    }

    #[test]
    fn test_run_submission_sends_once() {
        let (tx, rx) = flume::unbounded();
        let (job, _disarm) = Submission::new(
            WorkItem::new(3u8),
            |n: &u8, _: &WorkContext| Ok::<u8, ExecutionFailure>(*n),
            CancelToken::new(),
            tx,
        )
        .into_job();
        job();

        assert_eq!(rx.try_recv().unwrap().state, WorkState::Completed);
        assert!(rx.try_recv().is_err());
    }
}
