// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! `objlink-pipe` — an in-process duplex transport for the objlink runtime.
//!
//! [`pair`] returns two connected endpoints; hand one to each
//! [`objlink::Session`]. The pipe owns everything below the runtime's two
//! primitives: the request/reply envelope, correlation sequence numbers, the
//! `{kind, message}` error envelope, and connection teardown.
//!
//! # Envelope
//!
//! ```text
//! A ──► Request {seq, verb, payload} ──► B   (handler spawned per request)
//! A ◄──      Ok {seq, payload}      ◄── B
//! A ◄──     Err {seq, error}        ◄── B
//! ```
//!
//! Requests issued by one peer are delivered to the other peer's handlers
//! in program order; handlers run as their own tasks, so a handler that
//! issues nested calls (class descriptions during reply marshaling) never
//! wedges the pump. One-way verbs ([`Verb::expects_reply`] is false, i.e.
//! `del`) get no reply frame at all: `call_remote` resolves as soon as the
//! frame is accepted, and handler errors are logged on the receiving side.
//! When an endpoint goes away, every outstanding call on the surviving side
//! rejects with `ConnectionLost`, and later calls reject immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use objlink::{Payload, Result, RpcError, Transport, Verb, VerbHandler};
use objlink_wire::ErrorEnvelope;

/// One frame on the pipe. Serde-derived so the same envelope can be framed
/// onto a byte transport unchanged.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Request {
        seq: u64,
        verb: Verb,
        payload: Payload,
    },
    Ok {
        seq: u64,
        payload: Payload,
    },
    Err {
        seq: u64,
        error: ErrorEnvelope,
    },
}

struct Shared {
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Payload>>>>,
    handlers: RwLock<HashMap<Verb, VerbHandler>>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    fn fail_outstanding(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending = std::mem::take(&mut *self.pending.lock().expect("pending poisoned"));
        if !pending.is_empty() {
            debug!(count = pending.len(), "rejecting outstanding calls");
        }
        for (_, tx) in pending {
            let _ = tx.send(Err(RpcError::ConnectionLost));
        }
    }
}

/// One endpoint of an in-process pipe.
pub struct PipeTransport {
    outbound: UnboundedSender<Frame>,
    shared: Arc<Shared>,
}

/// Create a connected pair of endpoints and spawn their pump tasks. Must be
/// called inside a tokio runtime.
pub fn pair() -> (Arc<PipeTransport>, Arc<PipeTransport>) {
    let (tx_ab, rx_ab) = mpsc::unbounded_channel();
    let (tx_ba, rx_ba) = mpsc::unbounded_channel();

    let a = Arc::new(PipeTransport {
        outbound: tx_ab.clone(),
        shared: Shared::new(),
    });
    let b = Arc::new(PipeTransport {
        outbound: tx_ba.clone(),
        shared: Shared::new(),
    });

    // Each pump holds only a weak reply sender: the channel closes when the
    // owning endpoint is dropped, which is what ends the peer's pump.
    tokio::spawn(pump(a.shared.clone(), rx_ba, tx_ab.downgrade()));
    tokio::spawn(pump(b.shared.clone(), rx_ab, tx_ba.downgrade()));

    (a, b)
}

/// Drain frames from the peer until the channel closes.
async fn pump(
    shared: Arc<Shared>,
    mut incoming: UnboundedReceiver<Frame>,
    reply_tx: WeakUnboundedSender<Frame>,
) {
    while let Some(frame) = incoming.recv().await {
        match frame {
            Frame::Request { seq, verb, payload } => {
                trace!(seq, %verb, "request");
                let fut = {
                    let handlers = shared.handlers.read().expect("handlers poisoned");
                    handlers.get(&verb).map(|h| h(payload))
                };
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let result = match fut {
                        Some(fut) => fut.await,
                        None => Err(RpcError::Protocol(format!("no handler for {verb}"))),
                    };
                    // One-way verbs get no reply frame; there is nobody
                    // waiting on the other side.
                    if !verb.expects_reply() {
                        if let Err(e) = result {
                            debug!(%verb, error = %e, "one-way verb handler failed");
                        }
                        return;
                    }
                    let frame = match result {
                        Ok(payload) => Frame::Ok { seq, payload },
                        Err(e) => Frame::Err {
                            seq,
                            error: e.to_envelope(),
                        },
                    };
                    if let Some(tx) = reply_tx.upgrade() {
                        let _ = tx.send(frame);
                    }
                });
            }
            Frame::Ok { seq, payload } => {
                complete(&shared, seq, Ok(payload));
            }
            Frame::Err { seq, error } => {
                complete(&shared, seq, Err(RpcError::from_envelope(error)));
            }
        }
    }
    debug!("pipe closed");
    shared.fail_outstanding();
}

fn complete(shared: &Shared, seq: u64, result: Result<Payload>) {
    let tx = shared
        .pending
        .lock()
        .expect("pending poisoned")
        .remove(&seq);
    match tx {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => warn!(seq, "reply for unknown correlation seq"),
    }
}

#[async_trait]
impl Transport for PipeTransport {
    fn register_incoming_call(&self, verb: Verb, handler: VerbHandler) {
        self.shared
            .handlers
            .write()
            .expect("handlers poisoned")
            .insert(verb, handler);
    }

    async fn call_remote(&self, verb: Verb, payload: Payload) -> Result<Payload> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ConnectionLost);
        }
        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);

        // Fire-and-forget: the frame is delivered, no reply is awaited.
        if !verb.expects_reply() {
            return match self.outbound.send(Frame::Request { seq, verb, payload }) {
                Ok(()) => Ok(Payload::Null),
                Err(_) => Err(RpcError::ConnectionLost),
            };
        }

        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .expect("pending poisoned")
            .insert(seq, tx);

        // The pump may have failed outstanding calls between the check above
        // and the insert; re-check so the entry cannot be stranded.
        if self.shared.closed.load(Ordering::SeqCst) {
            self.shared
                .pending
                .lock()
                .expect("pending poisoned")
                .remove(&seq);
            return Err(RpcError::ConnectionLost);
        }

        if self
            .outbound
            .send(Frame::Request {
                seq,
                verb,
                payload,
            })
            .is_err()
        {
            self.shared
                .pending
                .lock()
                .expect("pending poisoned")
                .remove(&seq);
            return Err(RpcError::ConnectionLost);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(RpcError::ConnectionLost),
        }
    }
}
