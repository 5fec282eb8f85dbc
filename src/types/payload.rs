// Record payload flattening and shape classification

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Key separator of flattened records.
pub const KEY_SEPARATOR: char = '.';

/// Field marking an object as carrying open-ended extensions.
pub const EXTENSION_FIELD: &str = "extension";

/// The closed set of shapes a payload value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Scalar,
    Object,
    /// An object with an `extension` member.
    ExtensionObject,
    List,
}

impl PayloadShape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key(EXTENSION_FIELD) => PayloadShape::ExtensionObject,
            Value::Object(_) => PayloadShape::Object,
            Value::Array(_) => PayloadShape::List,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                PayloadShape::Scalar
            }
        }
    }

    pub fn is_extension(&self) -> bool {
        matches!(self, PayloadShape::ExtensionObject)
    }
}

/// Flatten a record into dot-path keys, list members keyed by index.
///
/// Iteration follows the record's own field order. Empty objects and lists
/// flatten to a single entry holding the empty container.
pub fn flatten(record: &Value) -> IndexMap<String, Value> {
    let mut flattened = IndexMap::new();
    match record {
        Value::Object(map) => flatten_object(map, None, &mut flattened),
        Value::Array(items) => flatten_list(items, None, &mut flattened),
        scalar => {
            flattened.insert(String::new(), scalar.clone());
        }
    }
    flattened
}

fn flatten_object(map: &Map<String, Value>, prefix: Option<&str>, out: &mut IndexMap<String, Value>) {
    for (key, value) in map {
        let path = join(prefix, key);
        flatten_value(value, path, out);
    }
}

fn flatten_list(items: &[Value], prefix: Option<&str>, out: &mut IndexMap<String, Value>) {
    for (index, value) in items.iter().enumerate() {
        let path = join(prefix, &index.to_string());
        flatten_value(value, path, out);
    }
}

fn flatten_value(value: &Value, path: String, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => flatten_object(map, Some(&path), out),
        Value::Array(items) if !items.is_empty() => flatten_list(items, Some(&path), out),
        other => {
            out.insert(path, other.clone());
        }
    }
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{KEY_SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

/// Numeric key segments select list members rather than schema positions.
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// First segment of a flattened key.
pub fn simple_key(flattened_key: &str) -> &str {
    flattened_key
        .split(KEY_SEPARATOR)
        .next()
        .unwrap_or(flattened_key)
}

/// Last `/` delimited segment of a url-ish string.
pub fn last_url_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
