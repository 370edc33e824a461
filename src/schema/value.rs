/// Context values — the caller-supplied key/value tree that placeholders,
/// conditionals, and loops resolve against.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A context tree supplied by the caller. Loop bodies push element-local
/// contexts that shadow outer keys.
pub type Context = HashMap<String, Value>;

/// A dynamic value resolvable from a rendering context.
///
/// Scalars substitute into placeholders; `List` values drive loop
/// directives (each element is a map whose keys become loop-local).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Context>),
}

impl Value {
    /// Truthiness used by conditional directives: `false`, zero, the empty
    /// string, and the empty list are falsy; everything else is truthy.
    /// A key that is missing entirely is falsy at the lookup site.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }

    /// The list behind this value, if it is one. Loops use this; any
    /// non-list value iterates zero times.
    pub fn as_list(&self) -> Option<&[Context]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Placeholder substitution form. Numbers format without locale
    /// dependence; a list referenced as a scalar emits nothing (lists are
    /// loop fodder, not substitutable text).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(_) => Ok(()),
        }
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

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Context>> for Value {
    fn from(items: Vec<Context>) -> Self {
        Value::List(items)
    }
}
