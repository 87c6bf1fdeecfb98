//! The caller-side execution context.
//!
//! An [`ExecutionContext`] stands for the logical thread that issued the
//! calls. Work runs elsewhere; continuations only ever run here, one at a
//! time, when the owner drives the loop with [`run`](ExecutionContext::run),
//! [`run_for`](ExecutionContext::run_for) or
//! [`run_once`](ExecutionContext::run_once).

use crate::cancel::CancelToken;
use crate::config::ContextConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, WorkError};
use crate::executor::Executor;
use crate::relay::{Completion, CompletionRelay, Continuation};
use offload_core::{WorkId, WorkSummary};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A continuation waiting for its item to finish.
pub(crate) struct Pending {
    pub(crate) continuation: Continuation,
    pub(crate) cancel: CancelToken,
}

/// State shared by a context and its dispatchers. Never leaves the thread.
///
/// Holding `completions` next to `receiver` keeps the channel open for the
/// context's whole life, so the loop never sees a disconnect.
pub(crate) struct Shared {
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) completions: flume::Sender<Completion>,
    pub(crate) pending: RefCell<HashMap<WorkId, Pending>>,
    receiver: flume::Receiver<Completion>,
    relay: CompletionRelay,
    running: Cell<bool>,
    history: RefCell<VecDeque<WorkSummary>>,
    config: ContextConfig,
}

impl Drop for Shared {
    fn drop(&mut self) {
        // The executor's drop may join its workers.
        let pending = self.pending.get_mut();
        for entry in pending.values() {
            entry.cancel.cancel();
        }
        if !pending.is_empty() {
            warn!(
                abandoned = pending.len(),
                "execution context dropped with work in flight, cancelling and releasing continuations uncalled"
            );
        }
    }
}

/// Event loop for one caller thread.
///
/// Cloning is cheap and yields another handle to the same loop. The type is
/// `!Send`: continuations may capture thread-local state such as `Rc`.
#[derive(Clone)]
pub struct ExecutionContext {
    shared: Rc<Shared>,
}

impl ExecutionContext {
    /// Create a context that offloads work to `executor`.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_config(executor, ContextConfig::default())
    }

    /// Create a context with explicit configuration.
    pub fn with_config(executor: Arc<dyn Executor>, config: ContextConfig) -> Self {
        let (completions, receiver) = flume::unbounded();
        Self {
            shared: Rc::new(Shared {
                executor,
                completions,
                pending: RefCell::new(HashMap::new()),
                receiver,
                relay: CompletionRelay::default(),
                running: Cell::new(false),
                history: RefCell::new(VecDeque::new()),
                config,
            }),
        }
    }

    /// A dispatcher that submits work on behalf of this context.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.shared.clone())
    }

    /// The executor work is offloaded to.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.shared.executor
    }

    /// Items submitted whose continuation has not run yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Whether any continuation is still outstanding.
    pub fn has_pending(&self) -> bool {
        !self.shared.pending.borrow().is_empty()
    }

    /// Continuations invoked so far.
    pub fn delivered(&self) -> u64 {
        self.shared.relay.delivered()
    }

    /// Request cancellation of a pending item.
    ///
    /// Returns `false` if the item is unknown or already delivered.
    pub fn cancel(&self, id: WorkId) -> bool {
        match self.shared.pending.borrow().get(&id) {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Block until every pending continuation has run.
    ///
    /// Returns the number of continuations invoked.
    pub fn run(&self) -> Result<usize> {
        let _running = self.enter()?;
        let mut delivered = 0;
        while self.has_pending() {
            let Ok(completion) = self.shared.receiver.recv() else {
                break;
            };
            delivered += self.deliver(completion)?;
        }
        Ok(delivered)
    }

    /// Like [`run`](Self::run), but gives up once `timeout` has elapsed.
    pub fn run_for(&self, timeout: Duration) -> Result<usize> {
        let _running = self.enter()?;
        let deadline = Instant::now() + timeout;
        let mut delivered = 0;
        while self.has_pending() {
            match self.shared.receiver.recv_deadline(deadline) {
                Ok(completion) => delivered += self.deliver(completion)?,
                Err(_) => break,
            }
        }
        Ok(delivered)
    }

    /// Deliver at most one completion that is already waiting. Never blocks.
    ///
    /// Returns whether a continuation ran.
    pub fn run_once(&self) -> Result<bool> {
        let _running = self.enter()?;
        match self.shared.receiver.try_recv() {
            Ok(completion) => Ok(self.deliver(completion)? > 0),
            Err(_) => Ok(false),
        }
    }

    /// Drain summaries of retired items, oldest first.
    pub fn take_history(&self) -> Vec<WorkSummary> {
        self.shared.history.borrow_mut().drain(..).collect()
    }

    fn enter(&self) -> Result<LoopGuard<'_>> {
        if self.shared.running.replace(true) {
            return Err(WorkError::ReentrantRun);
        }
        Ok(LoopGuard(&self.shared.running))
    }

    fn deliver(&self, completion: Completion) -> Result<usize> {
        // The table borrow must end before the continuation runs: it may submit more work.
        let pending = self.shared.pending.borrow_mut().remove(&completion.id);
        let Some(pending) = pending else {
            debug!(id = %completion.id, "discarding completion for unknown work item");
            return Ok(0);
        };

        if let Some(summary) = self.shared.relay.deliver(completion, pending.continuation)? {
            self.record(summary);
        }
        Ok(1)
    }

    fn record(&self, summary: WorkSummary) {
        let limit = self.shared.config.history_limit;
        if limit == 0 {
            return;
        }
        let mut history = self.shared.history.borrow_mut();
        while history.len() >= limit {
            history.pop_front();
        }
        history.push_back(summary);
    }
}

struct LoopGuard<'a>(&'a Cell<bool>);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
