//! Fixed-size OS thread pool.

use crate::error::ExecutorError;
use crate::executor::{Executor, Job, Rejected};
use offload_core::ExecutionFailure;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME: &str = "offload-worker";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queue shared by all workers of a pool.
///
/// Idle workers park on the condition variable until a job is pushed or
/// the pool shuts down.
struct Injector {
    queue: Mutex<VecDeque<Job>>,
    available: Condvar,
    shutdown: AtomicBool,
}

impl Injector {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    fn push(&self, job: Job) -> Result<(), Rejected> {
        let mut queue = lock(&self.queue);
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Rejected::new(job, ExecutorError::ShutDown));
        }
        queue.push_back(job);
        drop(queue);
        self.available.notify_one();
        Ok(())
    }

    /// Next job, or `None` once shut down and drained.
    fn next(&self) -> Option<Job> {
        let mut queue = lock(&self.queue);
        loop {
            if let Some(job) = queue.pop_front() {
                return Some(job);
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            queue = self
                .available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn shutdown(&self) {
        // Flag is flipped under the lock so a worker between its check and
        // its wait cannot miss the wakeup.
        let queue = lock(&self.queue);
        self.shutdown.store(true, Ordering::Release);
        drop(queue);
        self.available.notify_all();
    }

    fn len(&self) -> usize {
        lock(&self.queue).len()
    }
}

/// A pool of named worker threads fed from one shared queue.
///
/// Dropping the pool stops intake, lets the workers finish every queued
/// job, and joins them.
pub struct ThreadPool {
    name: String,
    workers: usize,
    injector: Arc<Injector>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self, ExecutorError> {
        Self::with_name(workers, DEFAULT_THREAD_NAME)
    }

    /// Create a pool whose threads are named `<name>-<index>`.
    pub fn with_name(workers: usize, name: impl Into<String>) -> Result<Self, ExecutorError> {
        let name = name.into();
        let workers = workers.max(1);
        let injector = Arc::new(Injector::new());
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let queue = injector.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(index, queue));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    injector.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(ExecutorError::Spawn(err));
                }
            }
        }

        debug!(pool = %name, workers, "thread pool started");
        Ok(Self {
            name,
            workers,
            injector,
            handles: Mutex::new(handles),
        })
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.injector.len()
    }

    /// Stop accepting jobs. Already queued jobs still run.
    pub fn shutdown(&self) {
        self.injector.shutdown();
    }

    /// Shut down and wait for every worker to exit.
    pub fn join(&self) {
        self.shutdown();
        let handles: Vec<_> = lock(&self.handles).drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            // A worker can never join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!(pool = %self.name, "worker thread exited with a panic");
            }
        }
        debug!(pool = %self.name, "thread pool stopped");
    }
}

impl Executor for ThreadPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn execute(&self, job: Job) -> Result<(), Rejected> {
        self.injector.push(job)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();
    }
}

fn worker_loop(index: usize, injector: Arc<Injector>) {
    debug!(worker = index, "worker started");
    while let Some(job) = injector.next() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let failure = ExecutionFailure::from_panic(payload.as_ref());
            error!(worker = index, %failure, "job panicked");
        }
    }
    debug!(worker = index, "worker stopped");
}
