//! Canonical JSON bytes.
//!
//! Object keys are emitted in lexicographic order at every depth, without
//! whitespace. This holds whether or not `serde_json` is built with
//! `preserve_order`, because the rebuilt maps are filled in sorted order.

use serde_json::{Map, Value};

/// Rebuild `value` with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical serialization of a JSON value.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    // Serializing a Value cannot fail: keys are strings and there are no
    // non-finite floats in a Value.
    serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
}
