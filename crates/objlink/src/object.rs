// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Local exposable values: classed objects and bare functions.
//!
//! Both carry a release slot that the identity registry arms on first
//! exposure; dropping the last `Arc` then notifies the GC bridge so the
//! registry slot can be reclaimed.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use objlink_wire::ObjectId;
use tokio::sync::mpsc::UnboundedSender;

use crate::class::ClassDef;
use crate::error::Result;
use crate::gc::{self, GcEvent};
use crate::value::{Record, Value};

// ── Release slot ──────────────────────────────────────────────────────────────

/// Armed by the registry when a value is first exposed to the peer. Fires a
/// [`GcEvent`] from `Drop`, which can only happen after the registry has
/// demoted its reference to weak.
pub(crate) struct ReleaseSlot {
    armed: Mutex<Option<(ObjectId, UnboundedSender<GcEvent>)>>,
}

impl ReleaseSlot {
    pub(crate) fn new() -> Self {
        Self {
            armed: Mutex::new(None),
        }
    }

    pub(crate) fn arm(&self, id: ObjectId, tx: UnboundedSender<GcEvent>) {
        *self.armed.lock().expect("release slot poisoned") = Some((id, tx));
    }

    fn fire(&self) {
        let Some((id, tx)) = self.armed.lock().expect("release slot poisoned").take() else {
            return;
        };
        if tx.send(GcEvent::LocalDropped(id)).is_err() {
            gc::warn_detached();
        }
    }
}

// ── LocalObject ───────────────────────────────────────────────────────────────

/// A classed in-process object: a class link plus a mutable field bag.
///
/// Identity is `Arc` pointer identity; the same `Arc` always marshals to the
/// same wire id for the lifetime of the peer's interest in it.
pub struct LocalObject {
    class: Arc<ClassDef>,
    fields: Mutex<Record>,
    pub(crate) release: ReleaseSlot,
}

impl LocalObject {
    pub fn new(class: Arc<ClassDef>, fields: Record) -> Arc<Self> {
        Arc::new(Self {
            class,
            fields: Mutex::new(fields),
            release: ReleaseSlot::new(),
        })
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.lock().expect("fields poisoned").get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields
            .lock()
            .expect("fields poisoned")
            .insert(name.into(), value);
    }

    pub fn fields_snapshot(&self) -> Record {
        self.fields.lock().expect("fields poisoned").clone()
    }
}

impl Drop for LocalObject {
    fn drop(&mut self) {
        self.release.fire();
    }
}

impl std::fmt::Debug for LocalObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObject").field("class", &self.class.name).finish()
    }
}

// ── LocalFunction ─────────────────────────────────────────────────────────────

type FnBody = Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A bare callable exposed across the wire as `{idLocal, className:
/// "Function"}`. The peer materializes a callable stub whose invocation
/// arrives as a `call` verb.
pub struct LocalFunction {
    body: FnBody,
    pub(crate) release: ReleaseSlot,
}

impl LocalFunction {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Arc<Self>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        Arc::new(Self {
            body: Box::new(move |args| Box::pin(f(args))),
            release: ReleaseSlot::new(),
        })
    }

    /// Wrap a synchronous closure.
    pub fn from_sync<F>(f: F) -> Arc<Self>
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            body: Box::new(move |args| {
                let out = f(args);
                Box::pin(async move { out })
            }),
            release: ReleaseSlot::new(),
        })
    }

    pub async fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        (self.body)(args).await
    }
}

impl Drop for LocalFunction {
    fn drop(&mut self) {
        self.release.fire();
    }
}

impl std::fmt::Debug for LocalFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFunction").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassDef;

    #[test]
    fn fields_read_back_after_write() {
        let class = ClassDef::builder("Box").build();
        let obj = LocalObject::new(class, Record::new());
        obj.set_field("w", Value::from(3.0));
        assert_eq!(obj.field("w"), Some(Value::from(3.0)));
        assert_eq!(obj.field("h"), None);
    }

    #[tokio::test]
    async fn sync_function_wraps_into_async_invoke() {
        let f = LocalFunction::from_sync(|args| {
            let sum: f64 = args.iter().filter_map(Value::as_f64).sum();
            Ok(Value::from(sum))
        });
        let out = f.invoke(vec![Value::from(3.0), Value::from(4.0)]).await;
        assert_eq!(out.unwrap(), Value::from(7.0));
    }
}
