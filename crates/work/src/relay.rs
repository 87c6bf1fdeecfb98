//! Completion relay: hands finished Work Items back to their continuations.
//!
//! Completions cross from worker threads to the caller's thread through a
//! channel. The continuation itself never leaves the caller's thread: it is
//! kept in the execution context's pending table and only joined with its
//! finished item here, inside the context's loop.

use crate::error::{Result, WorkError};
use crate::executor::Finished;
use offload_core::{ExecutionFailure, WorkId, WorkState, WorkSummary};
use std::any::Any;
use std::cell::Cell;
use tracing::{debug, error};

/// A finished item travelling from a worker back to the execution context.
pub(crate) struct Completion {
    pub(crate) id: WorkId,
    pub(crate) state: WorkState,
    finished: Box<dyn Any + Send>,
}

impl Completion {
    /// Queue a finished item onto the originating context.
    pub(crate) fn send<P, T>(completions: &flume::Sender<Completion>, finished: Finished<P, T>)
    where
        P: Send + 'static,
        T: Send + 'static,
    {
        let id = finished.item.id;
        let completion = Completion {
            id,
            state: finished.item.state(),
            finished: Box::new(finished),
        };
        if completions.send(completion).is_err() {
            debug!(%id, "execution context is gone, dropping completion");
        }
    }
}

/// Caller-side continuation, type-erased so one channel serves every item.
pub(crate) type Continuation = Box<dyn FnOnce(Box<dyn Any + Send>) -> Option<WorkSummary>>;

/// Wrap a typed continuation so the relay can call it with an erased
/// completion. Retires the item after the continuation returns.
pub(crate) fn erase<P, T, C>(continuation: C) -> Continuation
where
    P: Send + 'static,
    T: Send + 'static,
    C: FnOnce(std::result::Result<T, ExecutionFailure>) + 'static,
{
    Box::new(move |finished: Box<dyn Any + Send>| {
        let finished = match finished.downcast::<Finished<P, T>>() {
            Ok(finished) => finished,
            Err(_) => {
                error!("completion payload does not match its continuation");
                return None;
            }
        };
        let Finished { mut item, output } = *finished;

        continuation(output);

        if let Err(err) = item.retire() {
            error!(%err, "failed to retire work item");
        }
        Some(item.summary())
    })
}

/// Delivers completions one at a time.
#[derive(Debug, Default)]
pub(crate) struct CompletionRelay {
    delivering: Cell<bool>,
    delivered: Cell<u64>,
}

impl CompletionRelay {
    /// Invoke `continuation` with the finished item.
    ///
    /// The item must be terminal. Returns the summary of the retired item.
    pub(crate) fn deliver(
        &self,
        completion: Completion,
        continuation: Continuation,
    ) -> Result<Option<WorkSummary>> {
        if !completion.state.is_terminal() {
            return Err(WorkError::NotTerminal {
                id: completion.id,
                state: completion.state,
            });
        }
        if self.delivering.replace(true) {
            return Err(WorkError::ReentrantRun);
        }
        let _delivering = DeliveryGuard(&self.delivering);

        debug!(id = %completion.id, state = %completion.state, "delivering completion");
        let summary = continuation(completion.finished);
        self.delivered.set(self.delivered.get() + 1);

        Ok(summary)
    }

    /// Number of continuations invoked so far.
    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.get()
    }
}

/// Clears the delivery flag even if the continuation unwinds.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::WorkItem;
    use std::rc::Rc;

    fn finished_item(output: std::result::Result<u32, ExecutionFailure>) -> Completion {
        let (tx, rx) = flume::unbounded();
        let mut item = WorkItem::new(());
        item.start().unwrap();
        match &output {
            Ok(_) => item.complete().unwrap(),
            Err(failure) => item.fail(failure.clone()).unwrap(),
        }
        Completion::send(&tx, Finished { item, output });
        rx.try_recv().unwrap()
    }

    #[test]
    fn test_deliver_invokes_continuation_once_and_retires() {
        let relay = CompletionRelay::default();
        let seen = Rc::new(Cell::new(0u32));
        let sink = seen.clone();
        let continuation = erase::<(), u32, _>(move |output| sink.set(output.unwrap()));

        let summary = relay
            .deliver(finished_item(Ok(9)), continuation)
            .unwrap()
            .unwrap();

        assert_eq!(seen.get(), 9);
        assert_eq!(summary.state, WorkState::Retired);
        assert!(summary.retired_at.is_some());
        assert_eq!(relay.delivered(), 1);
    }

    #[test]
    fn test_deliver_passes_failure_through() {
        let relay = CompletionRelay::default();
        let seen = Rc::new(Cell::new(false));
        let sink = seen.clone();
        let continuation = erase::<(), u32, _>(move |output| {
            sink.set(output == Err(ExecutionFailure::Interrupted("eintr".into())));
        });

        let summary = relay
            .deliver(
                finished_item(Err(ExecutionFailure::Interrupted("eintr".into()))),
                continuation,
            )
            .unwrap()
            .unwrap();

        assert!(seen.get());
        assert_eq!(
            summary.error,
            Some(ExecutionFailure::Interrupted("eintr".into()))
        );
    }

    #[test]
    fn test_deliver_rejects_unfinished_item() {
        let (tx, rx) = flume::unbounded();
        let item = WorkItem::new(());
        Completion::send(
            &tx,
            Finished::<(), ()> {
                item,
                output: Ok(()),
            },
        );

        let relay = CompletionRelay::default();
        let called = Rc::new(Cell::new(false));
        let sink = called.clone();
        let result = relay.deliver(
            rx.try_recv().unwrap(),
            erase::<(), (), _>(move |_| sink.set(true)),
        );

        assert!(matches!(
            result,
            Err(WorkError::NotTerminal {
                state: WorkState::Submitted,
                ..
            })
        ));
        assert!(!called.get());
        assert_eq!(relay.delivered(), 0);
    }

    #[test]
    fn test_mismatched_payload_is_not_delivered() {
        let relay = CompletionRelay::default();
        let called = Rc::new(Cell::new(false));
        let sink = called.clone();
        let continuation = erase::<(), String, _>(move |_| sink.set(true));

        let summary = relay.deliver(finished_item(Ok(1)), continuation).unwrap();

        assert!(summary.is_none());
        assert!(!called.get());
    }
}
