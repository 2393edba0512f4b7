// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The dispatch core.
//!
//! [`Session::start`] wires a seed object to a transport: it installs one
//! handler per wire verb, spawns the GC bridge, and from then on the peer
//! can pull the marshaled seed with `start` and work the object graph from
//! there. Inbound handlers resolve their target through the identity
//! registry, unmarshal arguments, run the local operation, and marshal the
//! result back; user exceptions are never caught here — they ride the
//! transport's error envelope to the caller.
//!
//! ```text
//!   caller ──► Stub::invoke ──► Transport::call_remote ─ ─ ─ ─ ─► peer
//!                                                                  │
//!   LocalObject ◄── registry ◄── SessionInner::dispatch ◄── handler┘
//!        │
//!        └─► method → result → marshal → reply ─ ─ ─ ─ ─► caller resolves
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use objlink_wire::{
    CallPayload, ClassDescription, DelPayload, FuncPayload, GetPayload, IterPayload, NewPayload,
    SetPayload, Verb, WireValue,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

use crate::class::ClassDef;
use crate::error::{Result, RpcError};
use crate::gc::{self, GcEvent};
use crate::mirror::IncomingMirror;
use crate::object::LocalObject;
use crate::registry::{LocalTarget, ObjectRegistry};
use crate::transport::{Payload, Transport};
use crate::value::Value;

/// One end of an object-graph RPC session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) registry: Mutex<ObjectRegistry>,
    /// Names of classes already described to the peer. A tokio mutex: it is
    /// held across the `class` round-trip so concurrent marshals of the same
    /// class serialize instead of double-sending.
    pub(crate) classes_sent: tokio::sync::Mutex<HashSet<String>>,
    pub(crate) incoming_classes: Mutex<IncomingMirror>,
    /// Classes the peer may construct via `new`.
    local_classes: Mutex<HashMap<String, Arc<ClassDef>>>,
    pub(crate) gc_tx: UnboundedSender<GcEvent>,
    pub(crate) self_weak: Weak<SessionInner>,
    seed: Value,
}

impl Session {
    /// One-shot initialization: install all verb handlers on `transport`,
    /// spawn the GC bridge, and publish `seed` as the reply to the peer's
    /// `start`. Must run inside a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, seed: Value) -> Session {
        let (gc_tx, gc_rx) = tokio::sync::mpsc::unbounded_channel();
        let inner = Arc::new_cyclic(|self_weak: &Weak<SessionInner>| SessionInner {
            transport: transport.clone(),
            registry: Mutex::new(ObjectRegistry::new(gc_tx.clone())),
            classes_sent: tokio::sync::Mutex::new(HashSet::new()),
            incoming_classes: Mutex::new(IncomingMirror::new()),
            local_classes: Mutex::new(HashMap::new()),
            gc_tx,
            self_weak: self_weak.clone(),
            seed,
        });

        for verb in Verb::ALL {
            let weak = Arc::downgrade(&inner);
            transport.register_incoming_call(
                verb,
                Box::new(move |payload| {
                    let weak = weak.clone();
                    Box::pin(async move {
                        let Some(inner) = weak.upgrade() else {
                            return Err(RpcError::ConnectionLost);
                        };
                        inner.dispatch(verb, payload).await
                    })
                }),
            );
        }

        gc::spawn_bridge(Arc::downgrade(&inner), gc_rx);
        info!("session started");
        Session { inner }
    }

    /// Allow the peer to construct instances of `class` with the `new` verb.
    pub fn register_class(&self, class: &Arc<ClassDef>) {
        debug!(class = class.name(), "class registered for remote construction");
        self.inner
            .local_classes
            .lock()
            .expect("classes poisoned")
            .insert(class.name().to_string(), class.clone());
    }

    /// Fetch the peer's seed object — the handshake that makes the remote
    /// graph reachable.
    pub async fn remote_start(&self) -> Result<Value> {
        let reply = self.inner.call_verb(Verb::Start, &()).await?;
        self.inner.unmarshal(reply)
    }

    /// Construct an instance of a peer class: `new {className, args}`.
    pub async fn new_remote(&self, class_name: &str, args: Vec<Value>) -> Result<Value> {
        let args = self.inner.marshal_args(args).await?;
        let reply = self
            .inner
            .call_verb(
                Verb::New,
                &NewPayload {
                    class_name: class_name.to_string(),
                    args,
                },
            )
            .await?;
        self.inner.unmarshal(reply)
    }
}

impl SessionInner {
    /// Issue an outbound verb and decode the reply as a wire value.
    pub(crate) async fn call_verb<T: serde::Serialize>(
        &self,
        verb: Verb,
        payload: &T,
    ) -> Result<WireValue> {
        let payload = objlink_wire::to_payload(payload)?;
        let reply = self.transport.call_remote(verb, payload).await?;
        Ok(objlink_wire::from_payload(reply)?)
    }

    async fn reply(&self, value: Value) -> Result<Payload> {
        Ok(objlink_wire::to_payload(&self.marshal(&value).await?)?)
    }

    fn local_object(&self, id: &objlink_wire::ObjectId) -> Result<Arc<LocalObject>> {
        match self
            .registry
            .lock()
            .expect("registry poisoned")
            .local_for(id)?
        {
            LocalTarget::Object(obj) => Ok(obj),
            LocalTarget::Function(_) => {
                Err(RpcError::Protocol(format!("{id} is a function, not an object")))
            }
        }
    }

    pub(crate) async fn dispatch(&self, verb: Verb, payload: Payload) -> Result<Payload> {
        trace!(%verb, "inbound verb");
        match verb {
            Verb::Start => {
                let seed = self.seed.clone();
                self.reply(seed).await
            }

            Verb::Class => {
                let descriptions: Vec<ClassDescription> = objlink_wire::from_payload(payload)?;
                let mut mirror = self.incoming_classes.lock().expect("mirror poisoned");
                for desc in descriptions {
                    mirror.receive(desc)?;
                }
                Ok(Payload::Null)
            }

            Verb::New => {
                let p: NewPayload = objlink_wire::from_payload(payload)?;
                let class = self
                    .local_classes
                    .lock()
                    .expect("classes poisoned")
                    .get(&p.class_name)
                    .cloned()
                    .ok_or_else(|| RpcError::UnknownClass(p.class_name.clone()))?;
                let args = self.unmarshal_args(p.args)?;
                let instance = class.construct(args)?;
                self.reply(instance).await
            }

            Verb::Call => {
                let p: CallPayload = objlink_wire::from_payload(payload)?;
                let target = self
                    .registry
                    .lock()
                    .expect("registry poisoned")
                    .local_for(&p.obj)?;
                let LocalTarget::Function(function) = target else {
                    return Err(RpcError::Protocol(format!(
                        "call target {} is not a function",
                        p.obj
                    )));
                };
                let args = self.unmarshal_args(p.args)?;
                let result = function.invoke(args).await?;
                self.reply(result).await
            }

            Verb::Func => {
                let p: FuncPayload = objlink_wire::from_payload(payload)?;
                let obj = self.local_object(&p.obj)?;
                let method = obj
                    .class()
                    .find_method(&p.name)
                    .ok_or_else(|| RpcError::member(obj.class().name(), &p.name))?;
                let args = self.unmarshal_args(p.args)?;
                let result = method(obj.clone(), args).await?;
                self.reply(result).await
            }

            Verb::Get => {
                let p: GetPayload = objlink_wire::from_payload(payload)?;
                let obj = self.local_object(&p.obj)?;
                let accessor = obj
                    .class()
                    .find_accessor(&p.name)
                    .ok_or_else(|| RpcError::member(obj.class().name(), &p.name))?;
                let value = (accessor.get)(obj.as_ref())?;
                self.reply(value).await
            }

            Verb::Set => {
                let p: SetPayload = objlink_wire::from_payload(payload)?;
                let obj = self.local_object(&p.obj)?;
                let accessor = obj
                    .class()
                    .find_accessor(&p.name)
                    .ok_or_else(|| RpcError::member(obj.class().name(), &p.name))?;
                let setter = accessor
                    .set
                    .ok_or_else(|| RpcError::member(obj.class().name(), &p.name))?;
                let value = self.unmarshal(p.value)?;
                setter(obj.as_ref(), value)?;
                Ok(Payload::Null)
            }

            Verb::Iter => {
                let p: IterPayload = objlink_wire::from_payload(payload)?;
                let obj = self.local_object(&p.obj)?;
                let factory = obj
                    .class()
                    .find_iterator(p.symbol)
                    .ok_or_else(|| RpcError::member(obj.class().name(), "iterator"))?;
                let iterator = factory(obj.clone())?;
                self.reply(iterator).await
            }

            Verb::Del => {
                let p: DelPayload = objlink_wire::from_payload(payload)?;
                self.registry
                    .lock()
                    .expect("registry poisoned")
                    .release_local(&p.id_remote);
                // `del` is one-way; the transport discards this value.
                Ok(Payload::Null)
            }
        }
    }
}
