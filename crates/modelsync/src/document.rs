//! Dotted-path helpers over schemaless documents.
//!
//! Presence means every path segment exists; a `null` leaf is present. A
//! scalar in an intermediate position makes the deeper path absent, and
//! [`set_field`] refuses to overwrite it.

use serde_json::{Map, Value};

/// A schemaless stored document.
pub type Document = Map<String, Value>;

/// Whether `path` resolves to an existing slot in `document`.
#[must_use]
pub fn field_present(document: &Document, path: &str) -> bool {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return false;
    };

    let mut current = document;
    for part in parts {
        match current.get(part) {
            Some(Value::Object(map)) => current = map,
            _ => return false,
        }
    }

    current.contains_key(last)
}

/// Set `path` to `value`, creating intermediate objects as needed. Returns
/// false without touching the document when an intermediate segment holds a
/// non-object value.
pub fn set_field(document: &mut Document, path: &str, value: Value) -> bool {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return false;
    };

    let mut current = document;
    for part in parts {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(map) = slot else {
            return false;
        };
        current = map;
    }

    current.insert(last.to_string(), value);
    true
}
