//! Blocking and non-blocking sleep with a callback.
//!
//! Both functions take `(milliseconds, callback)`. [`sleep_callback`] sleeps
//! on the caller's thread and calls back before returning.
//! [`sleep_callback_async`] hands the sleep to the executor and returns at
//! once; the callback runs later, on the caller's thread, when the owning
//! [`ExecutionContext`](offload_work::ExecutionContext) delivers it.

use crate::error::{AddonError, Result};
use crate::value::{Function, Value};
use offload_core::ExecutionFailure;
use offload_work::{run_blocking, Dispatcher, WorkContext, WorkHandle};
use std::time::Duration;
use tracing::debug;

const SLEEP_ARGUMENTS: &str = "You must pass in the sleep time and a callback function";
const SLEEP_TIME_TYPE: &str = "Your first argument must be an integer.";
const CALLBACK_TYPE: &str = "Your second argument must be a callback function.";

/// Validated arguments of a sleep call.
#[derive(Debug, Clone)]
pub struct SleepRequest {
    /// How long to sleep
    pub duration: Duration,
    /// What to call afterwards
    pub callback: Function,
}

impl SleepRequest {
    /// Validate `(milliseconds, callback)`.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        if args.len() < 2 {
            return Err(AddonError::InvalidArgumentCount {
                expected: 2,
                actual: args.len(),
                message: SLEEP_ARGUMENTS,
            });
        }
        let millis = args[0].as_uint32().ok_or(AddonError::InvalidArgumentType {
            position: 0,
            expected: "unsigned integer",
            actual: args[0].type_name(),
            message: SLEEP_TIME_TYPE,
        })?;
        let callback = args[1]
            .as_function()
            .cloned()
            .ok_or(AddonError::InvalidArgumentType {
                position: 1,
                expected: "function",
                actual: args[1].type_name(),
                message: CALLBACK_TYPE,
            })?;

        Ok(Self {
            duration: Duration::from_millis(millis.into()),
            callback,
        })
    }
}

fn sleep_work(
    duration: &Duration,
    ctx: &WorkContext,
) -> std::result::Result<(), ExecutionFailure> {
    ctx.sleep(*duration)
}

/// Success calls back with no arguments; failure with the failure message.
fn call_back(callback: &Function, result: std::result::Result<(), ExecutionFailure>) {
    match result {
        Ok(()) => callback.call(&[]),
        Err(failure) => callback.call(&[Value::String(failure.to_string())]),
    }
}

/// `sleepCallback(ms, cb)`: sleep on the calling thread, then call `cb`.
pub fn sleep_callback(args: &[Value]) -> Result<Value> {
    let SleepRequest { duration, callback } = SleepRequest::from_args(args)?;
    debug!(?duration, "blocking sleep");
    run_blocking(duration, sleep_work, |result| call_back(&callback, result));
    Ok(Value::Undefined)
}

/// `sleepCallbackAsync(ms, cb)`: sleep on a worker thread and return immediately.
///
/// `cb` runs on the dispatcher's thread once its context delivers the
/// completion. Validation errors are returned before anything is scheduled.
pub fn sleep_callback_async(dispatcher: &Dispatcher, args: &[Value]) -> Result<WorkHandle> {
    let SleepRequest { duration, callback } = SleepRequest::from_args(args)?;
    let handle = dispatcher.submit(duration, sleep_work, move |result| {
        call_back(&callback, result)
    })?;
    debug!(id = %handle.id(), ?duration, "non-blocking sleep submitted");
    Ok(handle)
}
