use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::Callable;
use crate::class::Instance;

/// Every value a Krust program can produce.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    Callable(Callable),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// Only `true`, non-empty strings and non-zero numbers are truthy.
    /// Functions, classes and instances never are.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0,
            Value::Callable(_) | Value::Instance(_) => false,
        }
    }

    /// Kind name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::Callable(_) => "callable",
            Value::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Shortest round-tripping decimal; integral values get no `.0`.
            Value::Number(n) => write!(f, "{}", n),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::Callable(callable) => write!(f, "{}", callable),

            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}
