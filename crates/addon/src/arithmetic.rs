//! Argument validation and numeric sums.

use crate::error::{AddonError, Result};
use crate::value::Value;

const TWO_NUMBERS: &str = "You must pass two numbers.";
const AT_LEAST_TWO_NUMBERS: &str = "You must pass at least two numbers.";
const ONLY_NUMBERS: &str = "You must pass in only number values.";

fn number_at(arg: &Value, position: usize) -> Result<f64> {
    arg.as_number().ok_or(AddonError::InvalidArgumentType {
        position,
        expected: "number",
        actual: arg.type_name(),
        message: ONLY_NUMBERS,
    })
}

/// `addTwoNumbers(a, b)`: the sum of the first two arguments.
///
/// Arguments past the second are ignored.
pub fn add_two_numbers(args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(AddonError::InvalidArgumentCount {
            expected: 2,
            actual: args.len(),
            message: TWO_NUMBERS,
        });
    }
    let a = number_at(&args[0], 0)?;
    let b = number_at(&args[1], 1)?;
    Ok(Value::Number(a + b))
}

/// `addMultipleNumbers(...xs)`: the sum of all arguments.
///
/// Stops at the first argument that is not a number and reports its position.
pub fn add_multiple_numbers(args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(AddonError::InvalidArgumentCount {
            expected: 2,
            actual: args.len(),
            message: AT_LEAST_TWO_NUMBERS,
        });
    }
    let mut sum = 0.0;
    for (position, arg) in args.iter().enumerate() {
        sum += number_at(arg, position)?;
    }
    Ok(Value::Number(sum))
}
