// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The recursive wire-value grammar.
//!
//! Every value crossing the wire is one of:
//!
//! | JSON shape | Meaning |
//! |---|---|
//! | `null`, bool, number, string | itself |
//! | array | ordered sequence of wire values |
//! | `{"plainObject": {…}}` | by-value field bag |
//! | `{"idLocal": id, "className"?: name}` | reference to an object owned by the **sender** |
//! | `{"idRemote": id}` | reference to an object owned by the **receiver** |
//! | `{"idLocal": id, "className": name, "properties": {…}}` | full description, first exposure of an instance |
//!
//! The enum is `#[serde(untagged)]`; variant order matters because the full
//! description must win over the bare `idLocal` reference when both
//! `idLocal` and `properties` are present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// A value in its wire form. See the module docs for the JSON grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<WireValue>),

    /// Full object description — the first time the sender exposes this
    /// instance. Tried before [`WireValue::LocalRef`] so that a payload
    /// carrying both `idLocal` and `properties` always parses as a
    /// description.
    #[serde(rename_all = "camelCase")]
    NewObject {
        id_local: ObjectId,
        class_name: String,
        properties: BTreeMap<String, WireValue>,
    },

    /// Reference to an object the sender owns. `className == "Function"`
    /// marks a callable; otherwise the id must already be known to the
    /// receiver.
    #[serde(rename_all = "camelCase")]
    LocalRef {
        id_local: ObjectId,
        #[serde(skip_serializing_if = "Option::is_none")]
        class_name: Option<String>,
    },

    /// Reference to an object the receiver owns — the sender is handing a
    /// stub back to the peer that exposed it.
    #[serde(rename_all = "camelCase")]
    RemoteRef { id_remote: ObjectId },

    /// By-value field bag. The receiver materializes a fresh record; no
    /// identity is shared.
    #[serde(rename_all = "camelCase")]
    Plain {
        plain_object: BTreeMap<String, WireValue>,
    },
}

impl WireValue {
    /// The wire name marking a callable in a `LocalRef`.
    pub const FUNCTION_CLASS: &'static str = "Function";

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

impl From<f64> for WireValue {
    fn from(n: f64) -> Self {
        WireValue::Number(n)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::String(s.to_string())
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(v: &WireValue) -> WireValue {
        let json = serde_json::to_value(v).expect("encode");
        serde_json::from_value(json).expect("decode")
    }

    #[test]
    fn primitives_round_trip() {
        for v in [
            WireValue::Null,
            WireValue::Bool(true),
            WireValue::Number(3.5),
            WireValue::String("hi".into()),
        ] {
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn local_ref_omits_absent_class_name() {
        let v = WireValue::LocalRef {
            id_local: ObjectId::from_raw("1"),
            class_name: None,
        };
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"idLocal": "1"}));
    }

    #[test]
    fn full_description_wins_over_bare_ref() {
        // A payload carrying both idLocal and properties must parse as a
        // NewObject even though LocalRef would also accept it.
        let json = json!({
            "idLocal": "9",
            "className": "Car",
            "properties": {"color": "red"}
        });
        let v: WireValue = serde_json::from_value(json).unwrap();
        match v {
            WireValue::NewObject {
                id_local,
                class_name,
                properties,
            } => {
                assert_eq!(id_local.as_str(), "9");
                assert_eq!(class_name, "Car");
                assert_eq!(
                    properties.get("color"),
                    Some(&WireValue::String("red".into()))
                );
            }
            other => panic!("expected NewObject, got {other:?}"),
        }
    }

    #[test]
    fn nested_lists_and_records_round_trip() {
        let v = WireValue::List(vec![
            WireValue::Number(1.0),
            WireValue::Plain {
                plain_object: [("a".to_string(), WireValue::Bool(false))].into(),
            },
            WireValue::RemoteRef {
                id_remote: ObjectId::from_raw("5"),
            },
        ]);
        assert_eq!(roundtrip(&v), v);
    }
}
