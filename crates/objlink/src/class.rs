// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Explicit class tables — the runtime's substitute for host reflection.
//!
//! A [`ClassDef`] records everything the mirror needs to describe a class to
//! the peer and everything the dispatch core needs to run inbound verbs
//! against an instance: a method table, accessor table, declared data
//! properties, an optional constructor, and an optional iterator factory.
//! Member lookup walks the parent chain on miss, which is what a prototype
//! chain does in hosts that have one.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use objlink_wire::IteratorKind;

use crate::error::{Result, RpcError};
use crate::object::LocalObject;
use crate::value::{Record, Value};

pub type MethodFn =
    Arc<dyn Fn(Arc<LocalObject>, Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;
pub type GetterFn = Arc<dyn Fn(&LocalObject) -> Result<Value> + Send + Sync>;
pub type SetterFn = Arc<dyn Fn(&LocalObject, Value) -> Result<()> + Send + Sync>;
pub type ConstructorFn = Arc<dyn Fn(Vec<Value>) -> Result<Record> + Send + Sync>;
/// Produces a fresh iterator object for one iteration pass over `self`.
pub type IteratorFn = Arc<dyn Fn(Arc<LocalObject>) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Accessor {
    pub(crate) get: GetterFn,
    pub(crate) set: Option<SetterFn>,
}

/// The shape and behavior of a class of local objects.
pub struct ClassDef {
    pub(crate) name: String,
    pub(crate) parent: Option<Arc<ClassDef>>,
    pub(crate) constructor: Option<ConstructorFn>,
    pub(crate) methods: BTreeMap<String, MethodFn>,
    pub(crate) accessors: BTreeMap<String, Accessor>,
    pub(crate) properties: Vec<String>,
    pub(crate) iterator: Option<(IteratorKind, IteratorFn)>,
}

impl ClassDef {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            def: ClassDef {
                name: name.into(),
                parent: None,
                constructor: None,
                methods: BTreeMap::new(),
                accessors: BTreeMap::new(),
                properties: Vec::new(),
                iterator: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassDef>> {
        self.parent.as_ref()
    }

    /// Make an instance with the given initial fields, bypassing the
    /// constructor.
    pub fn instance(self: &Arc<Self>, fields: Record) -> Value {
        Value::Object(LocalObject::new(self.clone(), fields))
    }

    /// Run the constructor against `args` and wrap the result. Errors with
    /// `UnknownMember` when the class chain defines no constructor.
    pub fn construct(self: &Arc<Self>, args: Vec<Value>) -> Result<Value> {
        let ctor = self
            .chain()
            .find_map(|c| c.constructor.clone())
            .ok_or_else(|| RpcError::member(&self.name, "constructor"))?;
        let fields = ctor(args)?;
        Ok(self.instance(fields))
    }

    /// Walk `self` and then each ancestor.
    pub(crate) fn chain(&self) -> impl Iterator<Item = &ClassDef> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<MethodFn> {
        self.chain().find_map(|c| c.methods.get(name).cloned())
    }

    pub(crate) fn find_accessor(&self, name: &str) -> Option<Accessor> {
        self.chain().find_map(|c| c.accessors.get(name).cloned())
    }

    pub(crate) fn find_iterator(&self, kind: IteratorKind) -> Option<IteratorFn> {
        self.chain().find_map(|c| match &c.iterator {
            Some((k, f)) if *k == kind => Some(f.clone()),
            _ => None,
        })
    }
}

/// Assembles a [`ClassDef`]. Obtained from [`ClassDef::builder`].
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    pub fn extends(mut self, parent: &Arc<ClassDef>) -> Self {
        self.def.parent = Some(parent.clone());
        self
    }

    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Record> + Send + Sync + 'static,
    {
        self.def.constructor = Some(Arc::new(f));
        self
    }

    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<LocalObject>, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        self.def
            .methods
            .insert(name.into(), Arc::new(move |obj, args| Box::pin(f(obj, args))));
        self
    }

    /// A method whose body completes without awaiting.
    pub fn method_sync<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<LocalObject>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.def.methods.insert(
            name.into(),
            Arc::new(move |obj, args| {
                let out = f(obj, args);
                Box::pin(async move { out })
            }),
        );
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, get: F) -> Self
    where
        F: Fn(&LocalObject) -> Result<Value> + Send + Sync + 'static,
    {
        self.def.accessors.insert(
            name.into(),
            Accessor {
                get: Arc::new(get),
                set: None,
            },
        );
        self
    }

    pub fn getter_setter<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&LocalObject) -> Result<Value> + Send + Sync + 'static,
        S: Fn(&LocalObject, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.def.accessors.insert(
            name.into(),
            Accessor {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        );
        self
    }

    /// Declare a data property name for the class description.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.def.properties.push(name.into());
        self
    }

    pub fn iterator<F>(mut self, kind: IteratorKind, f: F) -> Self
    where
        F: Fn(Arc<LocalObject>) -> Result<Value> + Send + Sync + 'static,
    {
        self.def.iterator = Some((kind, Arc::new(f)));
        self
    }

    pub fn build(self) -> Arc<ClassDef> {
        Arc::new(self.def)
    }
}
