// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The transport contract — the only two primitives the runtime needs.
//!
//! A binding owns everything beneath them: envelope framing, correlation
//! ids, the error-envelope encoding, and connection lifecycle. The runtime
//! requires request/reply semantics per call and program-order delivery of
//! requests issued by one peer; replies may arrive in any order. A handler
//! that returns an error must surface on the calling side as the rejection
//! of that call.

use async_trait::async_trait;
use futures::future::BoxFuture;
use objlink_wire::Verb;

use crate::error::Result;

/// Verb payloads travel as JSON values; the runtime owns their schemas.
pub type Payload = serde_json::Value;

/// An installed verb handler. Handlers may issue nested outbound calls, so
/// transports must not block their receive loop on a running handler.
pub type VerbHandler = Box<dyn Fn(Payload) -> BoxFuture<'static, Result<Payload>> + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Install the handler for an inbound verb. Called once per verb during
    /// session start, before any call is issued.
    fn register_incoming_call(&self, verb: Verb, handler: VerbHandler);

    /// Send an outbound verb and await the peer's reply. Rejects with the
    /// peer's error, or with `ConnectionLost` when the channel is gone.
    ///
    /// For one-way verbs (`Verb::expects_reply()` is false) the peer sends
    /// no reply: the call resolves with a null payload once the frame has
    /// been accepted for delivery.
    async fn call_remote(&self, verb: Verb, payload: Payload) -> Result<Payload>;
}
