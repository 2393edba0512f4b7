// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The class mirror.
//!
//! Outgoing: [`describe`] flattens a [`ClassDef`] into the wire
//! [`ClassDescription`], filtering `_`-prefixed members. The dispatch core
//! keeps the sent-set and the parent-before-child ordering (see
//! `marshal::ensure_class_described`).
//!
//! Incoming: [`IncomingMirror`] holds the `className → StubClass` table. A
//! [`StubClass`] is the typed-language stand-in for a stub prototype: member
//! name tables the stub consults before forwarding, with parent-chain
//! traversal on miss.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use objlink_wire::{ClassDescription, GetterSpec, IteratorKind};
use tracing::debug;

use crate::class::ClassDef;
use crate::error::{Result, RpcError};

/// Build the wire description of a class's own members.
pub(crate) fn describe(class: &ClassDef) -> ClassDescription {
    ClassDescription {
        class_name: class.name.clone(),
        extends: class.parent.as_ref().map(|p| p.name.clone()),
        iterator: class.iterator.as_ref().map(|(kind, _)| *kind),
        functions: class
            .methods
            .keys()
            .filter(|name| !name.starts_with('_'))
            .cloned()
            .collect(),
        getters: class
            .accessors
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, acc)| GetterSpec {
                name: name.clone(),
                has_setter: acc.set.is_some(),
            })
            .collect(),
        properties: class
            .properties
            .iter()
            .filter(|name| !name.starts_with('_'))
            .cloned()
            .collect(),
    }
}

/// The materialized shape of a peer class. Carries the member-name tables
/// stubs consult before forwarding; instance data properties travel with
/// each instance, not with the class.
pub(crate) struct StubClass {
    name: String,
    parent: Option<Arc<StubClass>>,
    functions: BTreeSet<String>,
    /// getter name → has_setter
    getters: BTreeMap<String, bool>,
    iterator: Option<IteratorKind>,
}

impl StubClass {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn chain(&self) -> impl Iterator<Item = &StubClass> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    pub(crate) fn has_method(&self, name: &str) -> bool {
        self.chain().any(|c| c.functions.contains(name))
    }

    /// `Some(has_setter)` when the chain defines the getter.
    pub(crate) fn getter(&self, name: &str) -> Option<bool> {
        self.chain().find_map(|c| c.getters.get(name).copied())
    }

    pub(crate) fn iterator(&self) -> Option<IteratorKind> {
        self.chain().find_map(|c| c.iterator)
    }
}

/// Per-session table of classes the peer has described to us.
pub(crate) struct IncomingMirror {
    classes: HashMap<String, Arc<StubClass>>,
}

impl IncomingMirror {
    pub(crate) fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<StubClass>> {
        self.classes.get(name).cloned()
    }

    /// Install a received description. Duplicates are ignored; a missing
    /// parent is a protocol violation by the peer.
    pub(crate) fn receive(&mut self, desc: ClassDescription) -> Result<()> {
        if self.classes.contains_key(&desc.class_name) {
            return Ok(());
        }
        let parent = match &desc.extends {
            Some(parent_name) => Some(
                self.classes
                    .get(parent_name)
                    .cloned()
                    .ok_or_else(|| RpcError::UnknownParentClass(parent_name.clone()))?,
            ),
            None => None,
        };
        debug!(class = %desc.class_name, extends = ?desc.extends, "mirroring peer class");
        let stub_class = Arc::new(StubClass {
            name: desc.class_name.clone(),
            parent,
            functions: desc.functions.into_iter().collect(),
            getters: desc
                .getters
                .into_iter()
                .map(|g| (g.name, g.has_setter))
                .collect(),
            iterator: desc.iterator,
        });
        self.classes.insert(desc.class_name, stub_class);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn plain_desc(name: &str, extends: Option<&str>) -> ClassDescription {
        ClassDescription {
            class_name: name.into(),
            extends: extends.map(String::from),
            iterator: None,
            functions: vec![],
            getters: vec![],
            properties: vec![],
        }
    }

    #[test]
    fn describe_filters_underscore_members() {
        let class = ClassDef::builder("Car")
            .method_sync("honk", |_o, _a| Ok(Value::Null))
            .method_sync("_secret", |_o, _a| Ok(Value::Null))
            .getter("owner", |_o| Ok(Value::Null))
            .getter("_hidden", |_o| Ok(Value::Null))
            .property("color")
            .property("_vin")
            .build();

        let desc = describe(&class);
        assert_eq!(desc.functions, vec!["honk"]);
        assert_eq!(desc.getters.len(), 1);
        assert_eq!(desc.getters[0].name, "owner");
        assert_eq!(desc.properties, vec!["color"]);
    }

    #[test]
    fn describe_reports_has_setter() {
        let class = ClassDef::builder("Car")
            .getter_setter("owner", |_o| Ok(Value::Null), |_o, _v| Ok(()))
            .getter("vin", |_o| Ok(Value::Null))
            .build();
        let desc = describe(&class);
        let by_name: std::collections::HashMap<_, _> = desc
            .getters
            .iter()
            .map(|g| (g.name.as_str(), g.has_setter))
            .collect();
        assert_eq!(by_name["owner"], true);
        assert_eq!(by_name["vin"], false);
    }

    #[test]
    fn receive_rejects_unknown_parent() {
        let mut mirror = IncomingMirror::new();
        let err = mirror
            .receive(plain_desc("Car", Some("Movable")))
            .unwrap_err();
        assert_eq!(err, RpcError::UnknownParentClass("Movable".into()));
    }

    #[test]
    fn receive_parent_then_child_links_the_chain() {
        let mut mirror = IncomingMirror::new();
        let mut movable = plain_desc("Movable", None);
        movable.functions = vec!["drive".into()];
        mirror.receive(movable).unwrap();
        mirror.receive(plain_desc("Car", Some("Movable"))).unwrap();

        let car = mirror.get("Car").unwrap();
        assert!(car.has_method("drive"), "inherited through the chain");
        assert!(!car.has_method("fly"));
    }

    #[test]
    fn duplicate_description_is_ignored() {
        let mut mirror = IncomingMirror::new();
        mirror.receive(plain_desc("Car", None)).unwrap();
        let first = mirror.get("Car").unwrap();
        mirror.receive(plain_desc("Car", None)).unwrap();
        assert!(Arc::ptr_eq(&first, &mirror.get("Car").unwrap()));
    }
}
