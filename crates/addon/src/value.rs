//! Tagged values as the host passes them to native functions.

use std::fmt;
use std::rc::Rc;

/// A host callable. Lives on the host's thread only.
#[derive(Clone)]
pub struct Function {
    name: String,
    body: Rc<dyn Fn(&[Value])>,
}

impl Function {
    /// Wrap a closure as a named host function.
    pub fn new(name: impl Into<String>, body: impl Fn(&[Value]) + 'static) -> Self {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    /// Function name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call with the given arguments.
    pub fn call(&self, args: &[Value]) {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

/// A value received from, or returned to, the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number (always a double, as in the host)
    Number(f64),
    /// String
    String(String),
    /// Callable
    Function(Function),
}

impl Value {
    /// Convenience constructor for [`Value::Function`].
    pub fn function(name: impl Into<String>, body: impl Fn(&[Value]) + 'static) -> Self {
        Value::Function(Function::new(name, body))
    }

    /// Host type name, as reported in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as an unsigned 32-bit integer, if it is a whole number in range.
    pub fn as_uint32(&self) -> Option<u32> {
        let n = self.as_number()?;
        if n.is_finite() && n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) {
            Some(n as u32)
        } else {
            None
        }
    }

    /// The callable, if this is a function.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Read a literal the way a script would write it.
    ///
    /// `undefined`, `null`, `true`, `false` and numbers are recognised;
    /// anything else is a string.
    pub fn parse_literal(text: &str) -> Self {
        match text.trim() {
            "undefined" => Value::Undefined,
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            trimmed => match trimmed.parse::<f64>() {
                Ok(n) if !trimmed.is_empty() => Value::Number(n),
                _ => Value::String(text.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Function(func) => write!(f, "{func:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}
