// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Class descriptions — the wire record of a class's stable shape.
//!
//! A description is sent at most once per class per direction per session,
//! and a parent class is always described before any child that names it in
//! `extends`.

use serde::{Deserialize, Serialize};

/// Which iteration protocol a class implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IteratorKind {
    #[serde(rename = "iterator")]
    Iterator,
    #[serde(rename = "asyncIterator")]
    AsyncIterator,
}

/// A getter entry in a class description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetterSpec {
    pub name: String,
    pub has_setter: bool,
}

/// The stable shape of a class's instances.
///
/// `functions`, `getters` and `properties` list only the class's *own*
/// members — inherited members are reachable through `extends`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDescription {
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterator: Option<IteratorKind>,
    pub functions: Vec<String>,
    pub getters: Vec<GetterSpec>,
    pub properties: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn iterator_kind_uses_symbol_names() {
        assert_eq!(
            serde_json::to_value(IteratorKind::AsyncIterator).unwrap(),
            json!("asyncIterator")
        );
        assert_eq!(
            serde_json::to_value(IteratorKind::Iterator).unwrap(),
            json!("iterator")
        );
    }

    #[test]
    fn description_omits_absent_parent_and_iterator() {
        let desc = ClassDescription {
            class_name: "Movable".into(),
            extends: None,
            iterator: None,
            functions: vec!["drive".into()],
            getters: vec![],
            properties: vec![],
        };
        assert_eq!(
            serde_json::to_value(&desc).unwrap(),
            json!({
                "className": "Movable",
                "functions": ["drive"],
                "getters": [],
                "properties": []
            })
        );
    }

    #[test]
    fn description_round_trips_with_getters() {
        let desc = ClassDescription {
            class_name: "Car".into(),
            extends: Some("Movable".into()),
            iterator: None,
            functions: vec![],
            getters: vec![GetterSpec {
                name: "owner".into(),
                has_setter: true,
            }],
            properties: vec!["color".into()],
        };
        let back: ClassDescription =
            serde_json::from_value(serde_json::to_value(&desc).unwrap()).unwrap();
        assert_eq!(back, desc);
        assert_eq!(
            serde_json::to_value(&desc).unwrap()["getters"][0],
            json!({"name": "owner", "hasSetter": true})
        );
    }
}
