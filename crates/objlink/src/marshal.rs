// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The recursive value marshaller.
//!
//! Outgoing, per value kind: data passes by value, local objects and
//! functions pass by reference (allocating ids on first exposure), stubs
//! pass back to their owner as `{idRemote}`. The first exposure of an
//! instance awaits the `class` exchange for its class chain before the
//! instance itself is emitted, so a description always reaches the peer
//! before anything that depends on it.
//!
//! An object's id is registered *before* its properties are recursed into:
//! a cyclic object graph therefore marshals its back-edges as short
//! `{idLocal}` references instead of recursing forever.
//!
//! Incoming is the mirror image and is fully synchronous: no wire traffic
//! is needed to materialize values, stubs included.

use std::collections::BTreeMap;

use async_recursion::async_recursion;
use objlink_wire::{Verb, WireValue};
use tracing::debug;

use crate::class::ClassDef;
use crate::error::{Result, RpcError};
use crate::mirror;
use crate::registry::Exposure;
use crate::session::SessionInner;
use crate::stub::Stub;
use crate::value::Value;

impl SessionInner {
    pub(crate) async fn marshal(&self, value: &Value) -> Result<WireValue> {
        to_wire(self, value).await
    }

    pub(crate) async fn marshal_args(&self, args: Vec<Value>) -> Result<Vec<WireValue>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in &args {
            out.push(to_wire(self, arg).await?);
        }
        Ok(out)
    }

    pub(crate) fn unmarshal(&self, wire: WireValue) -> Result<Value> {
        from_wire(self, wire)
    }

    pub(crate) fn unmarshal_args(&self, args: Vec<WireValue>) -> Result<Vec<Value>> {
        args.into_iter().map(|w| from_wire(self, w)).collect()
    }
}

#[async_recursion]
async fn to_wire(session: &SessionInner, value: &Value) -> Result<WireValue> {
    match value {
        Value::Null => Ok(WireValue::Null),
        Value::Bool(b) => Ok(WireValue::Bool(*b)),
        Value::Number(n) => Ok(WireValue::Number(*n)),
        Value::String(s) => Ok(WireValue::String(s.clone())),

        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_wire(session, item).await?);
            }
            Ok(WireValue::List(out))
        }

        Value::Record(map) => {
            let mut out = BTreeMap::new();
            for (name, item) in map {
                out.insert(name.clone(), to_wire(session, item).await?);
            }
            Ok(WireValue::Plain { plain_object: out })
        }

        Value::Function(f) => {
            let id = session
                .registry
                .lock()
                .expect("registry poisoned")
                .expose_function(f);
            Ok(WireValue::LocalRef {
                id_local: id,
                class_name: Some(WireValue::FUNCTION_CLASS.to_string()),
            })
        }

        // A stub marshals back to the peer that owns the object.
        Value::Stub(stub) => Ok(WireValue::RemoteRef {
            id_remote: stub.id().clone(),
        }),

        Value::Object(obj) => {
            let (id, exposure) = session
                .registry
                .lock()
                .expect("registry poisoned")
                .expose_object(obj);
            match exposure {
                Exposure::Known => Ok(WireValue::LocalRef {
                    id_local: id,
                    class_name: None,
                }),
                Exposure::NeedsDescription => {
                    ensure_described(session, obj.class()).await?;
                    let fields = obj.fields_snapshot();
                    let mut properties = BTreeMap::new();
                    for (name, item) in &fields {
                        if name.starts_with('_') {
                            continue;
                        }
                        properties.insert(name.clone(), to_wire(session, item).await?);
                    }
                    Ok(WireValue::NewObject {
                        id_local: id,
                        class_name: obj.class().name().to_string(),
                        properties,
                    })
                }
            }
        }
    }
}

/// Send the class descriptions the peer is missing, ancestors first, and
/// await each ack. The ack doubles as the ordering barrier required between
/// a description and the first instance that names it.
#[async_recursion]
async fn ensure_described(session: &SessionInner, class: &std::sync::Arc<ClassDef>) -> Result<()> {
    if let Some(parent) = class.parent() {
        ensure_described(session, parent).await?;
    }
    let mut sent = session.classes_sent.lock().await;
    if sent.contains(class.name()) {
        return Ok(());
    }
    debug!(class = class.name(), "describing class to peer");
    let payload = objlink_wire::to_payload(&vec![mirror::describe(class)])?;
    session.transport.call_remote(Verb::Class, payload).await?;
    sent.insert(class.name().to_string());
    Ok(())
}

fn from_wire(session: &SessionInner, wire: WireValue) -> Result<Value> {
    match wire {
        WireValue::Null => Ok(Value::Null),
        WireValue::Bool(b) => Ok(Value::Bool(b)),
        WireValue::Number(n) => Ok(Value::Number(n)),
        WireValue::String(s) => Ok(Value::String(s)),

        WireValue::List(items) => Ok(Value::List(
            items
                .into_iter()
                .map(|w| from_wire(session, w))
                .collect::<Result<_>>()?,
        )),

        WireValue::Plain { plain_object } => {
            let mut out = crate::value::Record::new();
            for (name, item) in plain_object {
                out.insert(name, from_wire(session, item)?);
            }
            Ok(Value::Record(out))
        }

        WireValue::NewObject {
            id_local,
            class_name,
            properties,
        } => {
            let class = session
                .incoming_classes
                .lock()
                .expect("mirror poisoned")
                .get(&class_name)
                .ok_or_else(|| RpcError::UnknownClass(class_name.clone()))?;
            let stub = Stub::instance(
                id_local.clone(),
                class,
                session.self_weak.clone(),
                session.gc_tx.clone(),
            );
            session
                .registry
                .lock()
                .expect("registry poisoned")
                .register_remote(id_local, &stub)?;
            // Registered before the properties are unmarshaled, so a
            // self-referential property resolves to this same stub.
            for (name, item) in properties {
                let value = from_wire(session, item)?;
                stub.set_property(name, value);
            }
            Ok(Value::Stub(stub))
        }

        WireValue::LocalRef {
            id_local,
            class_name,
        } => {
            if let Some(stub) = session
                .registry
                .lock()
                .expect("registry poisoned")
                .remote_for(&id_local)
            {
                return Ok(Value::Stub(stub));
            }
            if class_name.as_deref() == Some(WireValue::FUNCTION_CLASS) {
                let stub = Stub::callable(
                    id_local.clone(),
                    session.self_weak.clone(),
                    session.gc_tx.clone(),
                );
                session
                    .registry
                    .lock()
                    .expect("registry poisoned")
                    .register_remote(id_local, &stub)?;
                return Ok(Value::Stub(stub));
            }
            // A bare reference is only legal for ids we already know.
            Err(RpcError::UnknownRemote(id_local))
        }

        WireValue::RemoteRef { id_remote } => Ok(session
            .registry
            .lock()
            .expect("registry poisoned")
            .local_for(&id_remote)?
            .into_value()),
    }
}
