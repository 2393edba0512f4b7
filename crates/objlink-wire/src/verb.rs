// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The fixed verb table and the payload struct for each verb.
//!
//! | Verb | Payload | Reply |
//! |---|---|---|
//! | `start` | none | marshaled start object |
//! | `class` | `Vec<ClassDescription>` | ack |
//! | `new` | [`NewPayload`] | marshaled instance |
//! | `call` | [`CallPayload`] | marshaled result |
//! | `func` | [`FuncPayload`] | marshaled result |
//! | `get` | [`GetPayload`] | marshaled value |
//! | `set` | [`SetPayload`] | ack |
//! | `iter` | [`IterPayload`] | marshaled iterator stub |
//! | `del` | [`DelPayload`] | none |
//!
//! `obj` fields always carry an id owned by the *receiver* — the caller is
//! addressing an object it only holds a stub for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::class::IteratorKind;
use crate::id::ObjectId;
use crate::value::WireValue;

/// One of the nine fixed method names exchanged over the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Start,
    Class,
    New,
    Call,
    Func,
    Get,
    Set,
    Iter,
    Del,
}

impl Verb {
    pub const ALL: [Verb; 9] = [
        Verb::Start,
        Verb::Class,
        Verb::New,
        Verb::Call,
        Verb::Func,
        Verb::Get,
        Verb::Set,
        Verb::Iter,
        Verb::Del,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Start => "start",
            Verb::Class => "class",
            Verb::New => "new",
            Verb::Call => "call",
            Verb::Func => "func",
            Verb::Get => "get",
            Verb::Set => "set",
            Verb::Iter => "iter",
            Verb::Del => "del",
        }
    }

    /// Whether a request with this verb expects a reply payload.
    /// `del` is fire-and-forget; everything else is request/response.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Verb::Del)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVerb(s.to_string()))
    }
}

/// Error returned when parsing an unrecognized verb name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verb: {0:?}")]
pub struct UnknownVerb(pub String);

// ── Per-verb payloads ─────────────────────────────────────────────────────────

/// `new {className, args}` — construct an instance of a receiver-side class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayload {
    pub class_name: String,
    pub args: Vec<WireValue>,
}

/// `call {obj, args}` — invoke a receiver-side function value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    pub obj: ObjectId,
    pub args: Vec<WireValue>,
}

/// `func {obj, name, args}` — invoke a named method on a receiver-side object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncPayload {
    pub obj: ObjectId,
    pub name: String,
    pub args: Vec<WireValue>,
}

/// `get {obj, name}` — read a getter on a receiver-side object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPayload {
    pub obj: ObjectId,
    pub name: String,
}

/// `set {obj, name, value}` — write through a setter on a receiver-side object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPayload {
    pub obj: ObjectId,
    pub name: String,
    pub value: WireValue,
}

/// `iter {obj, symbol}` — obtain an iterator stub for a receiver-side object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterPayload {
    pub obj: ObjectId,
    pub symbol: IteratorKind,
}

/// `del {idRemote}` — the sender dropped its stub for a receiver-owned object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelPayload {
    pub id_remote: ObjectId,
}
