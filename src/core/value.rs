//! Runtime value model.
//!
//! The scripting side is seen through this small dynamic value type: the
//! "no value" sentinel, scalars, handles to linked descriptors and callables.

use std::fmt;
use std::sync::Arc;

use super::handle::Handle;

type CallFn = dyn Fn(&[Value]) -> Option<Value> + Send + Sync;

/// A runtime callable. Returning `None` means the call failed.
#[derive(Clone)]
pub struct Callback(Arc<CallFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        Callback(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Option<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0))
    }
}

/// A dynamically typed runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The "no value" sentinel
    #[default]
    None,
    Bool(bool),
    Int(i128),
    Str(String),
    /// Reference to a linked native descriptor
    Handle(Handle),
    Callable(Callback),
}

impl Value {
    /// Truthiness: `None`, `false`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Handle(_) | Value::Callable(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable(_))
    }

    /// Numeric view; booleans count as 0/1.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i128),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Value::Handle(h) => Some(*h),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i128)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v as i128)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::None, Value::Str)
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Handle(h)
    }
}
