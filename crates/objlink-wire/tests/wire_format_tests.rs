//! Wire-format tests: assert the exact JSON every wire type produces and
//! that each shape parses back to the same value.
//!
//! The JSON shapes here are the protocol contract — a change that breaks one
//! of these tests breaks interop with every deployed peer.

use serde_json::json;

use objlink_wire::{
    ClassDescription, DelPayload, ErrorEnvelope, ErrorKind, FuncPayload, GetterSpec, IterPayload,
    IteratorKind, NewPayload, ObjectId, SetPayload, Verb, WireValue,
};

fn roundtrip<T>(value: &T) -> T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    serde_json::from_value(serde_json::to_value(value).expect("encode")).expect("decode")
}

// ── WireValue grammar ─────────────────────────────────────────────────────────

#[test]
fn null_is_json_null() {
    assert_eq!(serde_json::to_value(WireValue::Null).unwrap(), json!(null));
    let v: WireValue = serde_json::from_value(json!(null)).unwrap();
    assert!(v.is_null());
}

#[test]
fn integers_parse_into_numbers() {
    let v: WireValue = serde_json::from_value(json!(7)).unwrap();
    assert_eq!(v, WireValue::Number(7.0));
}

#[test]
fn arrays_preserve_order() {
    let v: WireValue = serde_json::from_value(json!([1, "two", null])).unwrap();
    assert_eq!(
        v,
        WireValue::List(vec![
            WireValue::Number(1.0),
            WireValue::String("two".into()),
            WireValue::Null,
        ])
    );
}

#[test]
fn plain_object_shape() {
    let v = WireValue::Plain {
        plain_object: [
            ("a".to_string(), WireValue::Number(1.0)),
            (
                "b".to_string(),
                WireValue::Plain {
                    plain_object: [("c".to_string(), WireValue::Number(2.0))].into(),
                },
            ),
        ]
        .into(),
    };
    assert_eq!(
        serde_json::to_value(&v).unwrap(),
        json!({"plainObject": {"a": 1.0, "b": {"plainObject": {"c": 2.0}}}})
    );
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn callable_ref_carries_function_class_name() {
    let v = WireValue::LocalRef {
        id_local: ObjectId::from_raw("12"),
        class_name: Some(WireValue::FUNCTION_CLASS.to_string()),
    };
    assert_eq!(
        serde_json::to_value(&v).unwrap(),
        json!({"idLocal": "12", "className": "Function"})
    );
}

#[test]
fn remote_ref_shape() {
    let v: WireValue = serde_json::from_value(json!({"idRemote": "3"})).unwrap();
    assert_eq!(
        v,
        WireValue::RemoteRef {
            id_remote: ObjectId::from_raw("3")
        }
    );
}

#[test]
fn full_description_parses_before_bare_ref() {
    let v: WireValue = serde_json::from_value(json!({
        "idLocal": "8",
        "className": "Car",
        "properties": {"color": "red", "doors": 4}
    }))
    .unwrap();
    match v {
        WireValue::NewObject {
            id_local,
            class_name,
            properties,
        } => {
            assert_eq!(id_local.as_str(), "8");
            assert_eq!(class_name, "Car");
            assert_eq!(properties.len(), 2);
        }
        other => panic!("expected full description, got {other:?}"),
    }
}

#[test]
fn description_nested_inside_array_round_trips() {
    let v = WireValue::List(vec![WireValue::NewObject {
        id_local: ObjectId::from_raw("1"),
        class_name: "Point".into(),
        properties: [("x".to_string(), WireValue::Number(0.0))].into(),
    }]);
    assert_eq!(roundtrip(&v), v);
}

// ── Class descriptions ────────────────────────────────────────────────────────

#[test]
fn class_description_full_shape() {
    let desc = ClassDescription {
        class_name: "Car".into(),
        extends: Some("Movable".into()),
        iterator: Some(IteratorKind::AsyncIterator),
        functions: vec!["honk".into()],
        getters: vec![GetterSpec {
            name: "owner".into(),
            has_setter: true,
        }],
        properties: vec!["color".into()],
    };
    assert_eq!(
        serde_json::to_value(&desc).unwrap(),
        json!({
            "className": "Car",
            "extends": "Movable",
            "iterator": "asyncIterator",
            "functions": ["honk"],
            "getters": [{"name": "owner", "hasSetter": true}],
            "properties": ["color"]
        })
    );
    assert_eq!(roundtrip(&desc), desc);
}

#[test]
fn class_payload_is_an_array() {
    let batch = vec![ClassDescription {
        class_name: "Movable".into(),
        extends: None,
        iterator: None,
        functions: vec![],
        getters: vec![],
        properties: vec![],
    }];
    let json = serde_json::to_value(&batch).unwrap();
    assert!(json.is_array());
    let back: Vec<ClassDescription> = serde_json::from_value(json).unwrap();
    assert_eq!(back, batch);
}

// ── Verb payloads ─────────────────────────────────────────────────────────────

#[test]
fn verb_wire_names() {
    let names: Vec<&str> = Verb::ALL.iter().map(|v| v.as_str()).collect();
    assert_eq!(
        names,
        ["start", "class", "new", "call", "func", "get", "set", "iter", "del"]
    );
}

#[test]
fn new_payload_shape() {
    let p = NewPayload {
        class_name: "Car".into(),
        args: vec![WireValue::String("Fred".into())],
    };
    assert_eq!(
        serde_json::to_value(&p).unwrap(),
        json!({"className": "Car", "args": ["Fred"]})
    );
}

#[test]
fn func_get_set_payload_shapes() {
    let f = FuncPayload {
        obj: ObjectId::from_raw("2"),
        name: "next".into(),
        args: vec![],
    };
    assert_eq!(
        serde_json::to_value(&f).unwrap(),
        json!({"obj": "2", "name": "next", "args": []})
    );

    let s = SetPayload {
        obj: ObjectId::from_raw("2"),
        name: "owner".into(),
        value: WireValue::String("Wilma".into()),
    };
    assert_eq!(
        serde_json::to_value(&s).unwrap(),
        json!({"obj": "2", "name": "owner", "value": "Wilma"})
    );
}

#[test]
fn iter_payload_symbol_values() {
    let p = IterPayload {
        obj: ObjectId::from_raw("4"),
        symbol: IteratorKind::AsyncIterator,
    };
    assert_eq!(
        serde_json::to_value(&p).unwrap(),
        json!({"obj": "4", "symbol": "asyncIterator"})
    );
    assert_eq!(roundtrip(&p), p);
}

#[test]
fn del_payload_round_trips() {
    let p = DelPayload {
        id_remote: ObjectId::from_raw("42"),
    };
    assert_eq!(roundtrip(&p), p);
}

// ── Error envelope ────────────────────────────────────────────────────────────

#[test]
fn error_envelope_shape() {
    let env = ErrorEnvelope::new(ErrorKind::UnknownRemote, "17");
    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({"kind": "unknown_remote", "message": "17"})
    );
}

#[test]
fn user_error_message_survives_verbatim() {
    let env = ErrorEnvelope::new(ErrorKind::User, "no such owner: Barney");
    let back: ErrorEnvelope = roundtrip(&env);
    assert_eq!(back.message, "no such owner: Barney");
    assert_eq!(back.kind, ErrorKind::User);
}
