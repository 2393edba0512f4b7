// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The GC bridge: turns value drops into registry reclamation and `del`
//! messages.
//!
//! Rust's deterministic `Drop` stands in for the host finalization
//! registries of the source model: dropping the last clone of a stub (or of
//! a demoted local value) pushes a [`GcEvent`] onto an unbounded channel,
//! and the bridge task spawned by the session drains it. `del` is the only
//! verb whose send failures are swallowed — the stub is already gone, so
//! there is nothing to reject.

use std::sync::{Once, Weak};

use objlink_wire::{DelPayload, ObjectId, Verb};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::session::SessionInner;

/// A collection notice from a drop hook.
#[derive(Debug)]
pub(crate) enum GcEvent {
    /// The last stub clone for a peer-owned id was dropped.
    StubDropped(ObjectId),
    /// A demoted local value was dropped.
    LocalDropped(ObjectId),
}

/// Warn exactly once when drop hooks outlive the session and release
/// notices can no longer be delivered. The runtime degrades: the peer keeps
/// its entries until the session itself goes away.
pub(crate) fn warn_detached() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        warn!("release channel closed; remote references will no longer be released");
    });
}

/// Drain `GcEvent`s for as long as the session is alive.
pub(crate) fn spawn_bridge(session: Weak<SessionInner>, mut rx: UnboundedReceiver<GcEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            match event {
                GcEvent::StubDropped(id) => {
                    let send_del = session
                        .registry
                        .lock()
                        .expect("registry poisoned")
                        .forget_remote_if_dead(&id);
                    if !send_del {
                        continue;
                    }
                    debug!(%id, "stub collected, releasing peer object");
                    let payload = DelPayload {
                        id_remote: id.clone(),
                    };
                    let payload = match objlink_wire::to_payload(&payload) {
                        Ok(p) => p,
                        Err(e) => {
                            debug!(%id, error = %e, "failed to encode del");
                            continue;
                        }
                    };
                    if let Err(e) = session.transport.call_remote(Verb::Del, payload).await {
                        debug!(%id, error = %e, "del send failed");
                    }
                }
                GcEvent::LocalDropped(id) => {
                    session
                        .registry
                        .lock()
                        .expect("registry poisoned")
                        .drop_local(&id);
                }
            }
        }
        debug!("gc bridge stopped");
    });
}
