// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `objlink-wire` — the wire data model for the objlink object-graph RPC
//! runtime.
//!
//! Everything two peers exchange is defined here as plain `serde` types:
//! the recursive [`WireValue`] grammar, [`ClassDescription`] records, the
//! [`Verb`] table with its per-verb payload structs, and the
//! [`ErrorEnvelope`] a transport uses to carry rejections.
//!
//! All payloads are JSON-representable; there is no binary framing at this
//! layer. Transports own envelopes, correlation ids, and connection
//! lifecycle — this crate is shared vocabulary only.
//!
//! # Example
//!
//! ```rust
//! use objlink_wire::{ObjectId, WireValue};
//!
//! let wire = WireValue::LocalRef {
//!     id_local: ObjectId::from_raw("7"),
//!     class_name: Some("Function".into()),
//! };
//! let json = serde_json::to_value(&wire).unwrap();
//! assert_eq!(json, serde_json::json!({"idLocal": "7", "className": "Function"}));
//! ```

pub mod class;
pub mod error;
pub mod id;
pub mod value;
pub mod verb;

pub use class::{ClassDescription, GetterSpec, IteratorKind};
pub use error::{ErrorEnvelope, ErrorKind};
pub use id::ObjectId;
pub use value::WireValue;
pub use verb::{
    CallPayload, DelPayload, FuncPayload, GetPayload, IterPayload, NewPayload, SetPayload,
    UnknownVerb, Verb,
};

/// Encode a verb payload as the JSON value handed to the transport.
pub fn to_payload<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(value)
}

/// Decode a verb payload received from the transport.
pub fn from_payload<T: for<'de> serde::Deserialize<'de>>(
    value: serde_json::Value,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(value)
}
