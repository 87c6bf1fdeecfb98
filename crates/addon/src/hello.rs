//! The simplest native function: return a constant.

use crate::error::Result;
use crate::value::Value;

/// Greeting returned by [`get_hello`].
pub const HELLO: &str = "Hello World!";

/// `getHello()`: ignores its arguments and returns [`HELLO`].
pub fn get_hello(_args: &[Value]) -> Result<Value> {
    Ok(Value::from(HELLO))
}
