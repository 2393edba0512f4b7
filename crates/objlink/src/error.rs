// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use objlink_wire::{ErrorEnvelope, ErrorKind, ObjectId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpcError>;

/// Every way a call through the runtime can fail.
///
/// User exceptions are never caught by the runtime itself — they travel to
/// the transport's error envelope and surface on the caller's side as
/// [`RpcError::User`] with the original message intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("unknown remote object {0}")]
    UnknownRemote(ObjectId),

    #[error("unknown local object {0}")]
    UnknownLocal(ObjectId),

    #[error("unknown parent class {0:?}")]
    UnknownParentClass(String),

    #[error("unknown class {0:?}")]
    UnknownClass(String),

    #[error("duplicate remote object {0}")]
    DuplicateRemote(ObjectId),

    #[error("no such member {0:?}")]
    UnknownMember(String),

    #[error("{0}")]
    User(String),

    #[error("connection lost")]
    ConnectionLost,

    #[error("unsupported host facility: {0}")]
    Unsupported(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RpcError {
    /// An exception raised by user code (a method, getter, setter or
    /// constructor body).
    pub fn user(message: impl Into<String>) -> Self {
        RpcError::User(message.into())
    }

    /// A member lookup miss, formatted `Class.member`.
    pub fn member(class: &str, name: &str) -> Self {
        RpcError::UnknownMember(format!("{class}.{name}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::UnknownRemote(_) => ErrorKind::UnknownRemote,
            RpcError::UnknownLocal(_) => ErrorKind::UnknownLocal,
            RpcError::UnknownParentClass(_) => ErrorKind::UnknownParentClass,
            RpcError::UnknownClass(_) => ErrorKind::UnknownClass,
            RpcError::DuplicateRemote(_) => ErrorKind::DuplicateRemote,
            RpcError::UnknownMember(_) => ErrorKind::UnknownMember,
            RpcError::User(_) => ErrorKind::User,
            RpcError::ConnectionLost => ErrorKind::ConnectionLost,
            RpcError::Unsupported(_) => ErrorKind::Unsupported,
            RpcError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// The variant detail that travels in the envelope's `message` field.
    fn detail(&self) -> String {
        match self {
            RpcError::UnknownRemote(id) | RpcError::UnknownLocal(id) => id.to_string(),
            RpcError::DuplicateRemote(id) => id.to_string(),
            RpcError::UnknownParentClass(name)
            | RpcError::UnknownClass(name)
            | RpcError::UnknownMember(name) => name.clone(),
            RpcError::User(msg) | RpcError::Unsupported(msg) | RpcError::Protocol(msg) => {
                msg.clone()
            }
            RpcError::ConnectionLost => String::new(),
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.kind(), self.detail())
    }

    pub fn from_envelope(env: ErrorEnvelope) -> Self {
        let ErrorEnvelope { kind, message } = env;
        match kind {
            ErrorKind::UnknownRemote => RpcError::UnknownRemote(ObjectId::from_raw(message)),
            ErrorKind::UnknownLocal => RpcError::UnknownLocal(ObjectId::from_raw(message)),
            ErrorKind::UnknownParentClass => RpcError::UnknownParentClass(message),
            ErrorKind::UnknownClass => RpcError::UnknownClass(message),
            ErrorKind::DuplicateRemote => RpcError::DuplicateRemote(ObjectId::from_raw(message)),
            ErrorKind::UnknownMember => RpcError::UnknownMember(message),
            ErrorKind::User => RpcError::User(message),
            ErrorKind::ConnectionLost => RpcError::ConnectionLost,
            ErrorKind::Unsupported => RpcError::Unsupported(message),
            ErrorKind::Protocol => RpcError::Protocol(message),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Protocol(e.to_string())
    }
}
