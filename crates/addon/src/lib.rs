//! Native functions exposed to a scripting host.
//!
//! Each entry point takes the host's arguments as a slice of [`Value`]s,
//! validates them, and either returns a value or an [`AddonError`] that the
//! host throws as an exception.
//!
//! | host name            | function                  |
//! |----------------------|---------------------------|
//! | `getHello`           | [`get_hello`]             |
//! | `addTwoNumbers`      | [`add_two_numbers`]       |
//! | `addMultipleNumbers` | [`add_multiple_numbers`]  |
//! | `sleepCallback`      | [`sleep_callback`]        |
//! | `sleepCallbackAsync` | [`sleep_callback_async`]  |

#![warn(missing_docs)]

mod arithmetic;
mod error;
mod hello;
mod sleep;
mod value;

pub use arithmetic::{add_multiple_numbers, add_two_numbers};
pub use error::{AddonError, ExceptionKind, Result};
pub use hello::{get_hello, HELLO};
pub use sleep::{sleep_callback, sleep_callback_async, SleepRequest};
pub use value::{Function, Value};
