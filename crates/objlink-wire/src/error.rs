// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The error envelope carried by transports when a call is rejected.
//!
//! The runtime raises structured errors; the transport flattens them into
//! `{kind, message}` so the rejection crosses the wire, and the caller's
//! side reconstructs the same kind and message. `message` carries the
//! variant detail verbatim (for a user exception, the user's message), not
//! prose, so it survives the round trip unchanged.

use serde::{Deserialize, Serialize};

/// Abstract error kinds surfaced through the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Incoming reference names an id with no live stub and no description.
    UnknownRemote,
    /// Incoming `idRemote` names an id not registered locally.
    UnknownLocal,
    /// A class description names a parent not yet received.
    UnknownParentClass,
    /// An instance description names a class never described.
    UnknownClass,
    /// Peer re-introduces an id that already has a live stub.
    DuplicateRemote,
    /// A member (method, accessor, iterator, constructor) is not defined on
    /// the addressed class chain.
    UnknownMember,
    /// A local operation raised; the message is the user's.
    User,
    /// The transport closed with calls outstanding.
    ConnectionLost,
    /// A host facility is missing; the runtime degrades instead of failing.
    Unsupported,
    /// Malformed or undecodable payload.
    Protocol,
}

/// A rejection in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorKind::UnknownParentClass).unwrap(),
            json!("unknown_parent_class")
        );
        assert_eq!(
            serde_json::to_value(ErrorKind::ConnectionLost).unwrap(),
            json!("connection_lost")
        );
    }

    #[test]
    fn envelope_round_trips() {
        let env = ErrorEnvelope::new(ErrorKind::User, "engine stalled");
        let back: ErrorEnvelope =
            serde_json::from_value(serde_json::to_value(&env).unwrap()).unwrap();
        assert_eq!(back, env);
    }
}
