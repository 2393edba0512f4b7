// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The in-memory value model the runtime marshals.
//!
//! There are three identity regimes, distinguished at the type level:
//!
//! - **data** (`Null`/`Bool`/`Number`/`String`/`List`/`Record`) — owned,
//!   compared structurally, copied across the wire by value;
//! - **local handles** (`Object`/`Function`) — `Arc`-backed, compared by
//!   pointer, marshaled by reference so the peer sees a stable identity;
//! - **stubs** (`Stub`) — proxies for peer-owned objects, marshaled back to
//!   the peer as a reference to the original.
//!
//! Plain records are ordinary owned maps, so record cycles cannot be built
//! at all; object graphs may contain cycles through `Arc` handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::object::{LocalFunction, LocalObject};
use crate::stub::Stub;

/// A by-value field bag. `BTreeMap` keeps field order deterministic on the
/// wire.
pub type Record = BTreeMap<String, Value>;

/// A value the runtime can hold, pass to methods, and marshal.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Record(Record),
    Object(Arc<LocalObject>),
    Function(Arc<LocalFunction>),
    Stub(Stub),
}

impl Value {
    pub fn record(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
        Value::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<LocalObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<LocalFunction>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_stub(&self) -> Option<&Stub> {
        match self {
            Value::Stub(stub) => Some(stub),
            _ => None,
        }
    }

    /// Pointer identity for handle values; `false` for data values even when
    /// structurally equal.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Stub(a), Value::Stub(b)) => a.same_stub(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Stub(a), Value::Stub(b)) => a.same_stub(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Record(map) => f.debug_tuple("Record").field(map).finish(),
            Value::Object(obj) => write!(f, "Object({})", obj.class().name()),
            Value::Function(_) => f.write_str("Function"),
            Value::Stub(stub) => write!(f, "Stub({})", stub.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
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
