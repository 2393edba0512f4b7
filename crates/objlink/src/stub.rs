// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Stubs — local proxies for peer-owned objects.
//!
//! An instance stub pairs the peer-assigned id with the mirrored
//! [`StubClass`] and a locally materialized property bag; every operation is
//! checked against the class chain, then forwarded as the matching verb. A
//! callable stub has a single operation, [`Stub::call`], which forwards the
//! `call` verb.
//!
//! Dropping the last clone of a stub notifies the GC bridge, which sends
//! `del` to the peer.

use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};

use futures::Stream;
use objlink_wire::{CallPayload, FuncPayload, GetPayload, IterPayload, ObjectId, SetPayload, Verb};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Result, RpcError};
use crate::gc::{self, GcEvent};
use crate::mirror::StubClass;
use crate::session::SessionInner;
use crate::value::{Record, Value};

/// The values produced by [`Stub::iterate`].
pub type ValueStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

pub(crate) enum StubShape {
    Instance {
        class: Arc<StubClass>,
        fields: Mutex<Record>,
    },
    Callable,
}

pub(crate) struct StubInner {
    id: ObjectId,
    shape: StubShape,
    session: Weak<SessionInner>,
    gc_tx: UnboundedSender<GcEvent>,
}

impl Drop for StubInner {
    fn drop(&mut self) {
        if self
            .gc_tx
            .send(GcEvent::StubDropped(self.id.clone()))
            .is_err()
        {
            gc::warn_detached();
        }
    }
}

/// A cheaply clonable handle to a peer-owned object.
#[derive(Clone)]
pub struct Stub {
    inner: Arc<StubInner>,
}

impl Stub {
    pub(crate) fn instance(
        id: ObjectId,
        class: Arc<StubClass>,
        session: Weak<SessionInner>,
        gc_tx: UnboundedSender<GcEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(StubInner {
                id,
                shape: StubShape::Instance {
                    class,
                    fields: Mutex::new(Record::new()),
                },
                session,
                gc_tx,
            }),
        }
    }

    pub(crate) fn callable(
        id: ObjectId,
        session: Weak<SessionInner>,
        gc_tx: UnboundedSender<GcEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(StubInner {
                id,
                shape: StubShape::Callable,
                session,
                gc_tx,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<StubInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<StubInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn id(&self) -> &ObjectId {
        &self.inner.id
    }

    pub fn class_name(&self) -> &str {
        match &self.inner.shape {
            StubShape::Instance { class, .. } => class.name(),
            StubShape::Callable => "Function",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.inner.shape, StubShape::Callable)
    }

    /// Two handles for the same underlying stub.
    pub fn same_stub(&self, other: &Stub) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a data property from the locally materialized bag. Properties
    /// travel with the full object description; reads never hit the wire.
    pub fn property(&self, name: &str) -> Option<Value> {
        match &self.inner.shape {
            StubShape::Instance { fields, .. } => {
                fields.lock().expect("stub fields poisoned").get(name).cloned()
            }
            StubShape::Callable => None,
        }
    }

    pub(crate) fn set_property(&self, name: String, value: Value) {
        if let StubShape::Instance { fields, .. } = &self.inner.shape {
            fields.lock().expect("stub fields poisoned").insert(name, value);
        }
    }

    fn session(&self) -> Result<Arc<SessionInner>> {
        self.inner.session.upgrade().ok_or(RpcError::ConnectionLost)
    }

    fn instance_class(&self) -> Result<&Arc<StubClass>> {
        match &self.inner.shape {
            StubShape::Instance { class, .. } => Ok(class),
            StubShape::Callable => Err(RpcError::member("Function", "members")),
        }
    }

    /// Invoke a mirrored method: `func {obj, name, args}`.
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let class = self.instance_class()?;
        if !class.has_method(name) {
            return Err(RpcError::member(class.name(), name));
        }
        let session = self.session()?;
        let args = session.marshal_args(args).await?;
        let reply = session
            .call_verb(
                Verb::Func,
                &FuncPayload {
                    obj: self.inner.id.clone(),
                    name: name.to_string(),
                    args,
                },
            )
            .await?;
        session.unmarshal(reply)
    }

    /// Read a mirrored getter: `get {obj, name}`.
    pub async fn get(&self, name: &str) -> Result<Value> {
        let class = self.instance_class()?;
        if class.getter(name).is_none() {
            return Err(RpcError::member(class.name(), name));
        }
        let session = self.session()?;
        let reply = session
            .call_verb(
                Verb::Get,
                &GetPayload {
                    obj: self.inner.id.clone(),
                    name: name.to_string(),
                },
            )
            .await?;
        session.unmarshal(reply)
    }

    /// Write through a mirrored setter: `set {obj, name, value}`. Only legal
    /// when the peer described the getter with `hasSetter`.
    pub async fn set(&self, name: &str, value: Value) -> Result<()> {
        let class = self.instance_class()?;
        if class.getter(name) != Some(true) {
            return Err(RpcError::member(class.name(), name));
        }
        let session = self.session()?;
        let value = session.marshal(&value).await?;
        session
            .call_verb(
                Verb::Set,
                &SetPayload {
                    obj: self.inner.id.clone(),
                    name: name.to_string(),
                    value,
                },
            )
            .await?;
        Ok(())
    }

    /// Invoke a callable stub: `call {obj, args}`.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        if !self.is_callable() {
            return Err(RpcError::member(self.class_name(), "call"));
        }
        let session = self.session()?;
        let args = session.marshal_args(args).await?;
        let reply = session
            .call_verb(
                Verb::Call,
                &CallPayload {
                    obj: self.inner.id.clone(),
                    args,
                },
            )
            .await?;
        session.unmarshal(reply)
    }

    /// Start an iteration pass: one `iter` verb, then one `func` pull per
    /// element against the iterator stub the peer returns. The stream ends
    /// at the first `{done: true}` step.
    pub async fn iterate(&self) -> Result<ValueStream> {
        let class = self.instance_class()?;
        let kind = class
            .iterator()
            .ok_or_else(|| RpcError::member(class.name(), "iterator"))?;
        let session = self.session()?;
        let reply = session
            .call_verb(
                Verb::Iter,
                &IterPayload {
                    obj: self.inner.id.clone(),
                    symbol: kind,
                },
            )
            .await?;
        let iter_stub = match session.unmarshal(reply)? {
            Value::Stub(stub) => stub,
            other => {
                return Err(RpcError::Protocol(format!(
                    "iter reply was not a stub: {other:?}"
                )))
            }
        };

        Ok(Box::pin(futures::stream::unfold(
            (iter_stub, false),
            |(stub, finished)| async move {
                if finished {
                    return None;
                }
                match stub.invoke("next", vec![]).await {
                    Err(e) => Some((Err(e), (stub, true))),
                    Ok(step) => {
                        let Some(record) = step.as_record() else {
                            let err =
                                RpcError::Protocol("iterator step was not a record".into());
                            return Some((Err(err), (stub, true)));
                        };
                        let done = record
                            .get("done")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        if done {
                            return None;
                        }
                        let value = record.get("value").cloned().unwrap_or(Value::Null);
                        Some((Ok(value), (stub, false)))
                    }
                }
            },
        )))
    }
}

impl std::fmt::Debug for Stub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stub")
            .field("id", &self.inner.id)
            .field("class", &self.class_name())
            .finish()
    }
}
