//! Path-based value access on JSON
//!
//! Paths use '/' as separator ("Reservations/Instances", "/NextToken").
//! Reading flattens through arrays; writing creates intermediate objects.

use serde_json::{Map, Value};

/// Extract a value from JSON using a path expression.
///
/// Paths support:
/// - Object field access: "/field"
/// - Nested access: "/field/subfield"
/// - Array flattening: when encountering an array, extracts from all items
///
/// Returns `Value::Null` if nothing is found.
pub fn extract_by_path(json: &Value, path: &str) -> Value {
    let parts = split_path(path);
    if parts.is_empty() {
        return json.clone();
    }
    extract_by_parts(json, &parts)
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_by_parts(json: &Value, parts: &[&str]) -> Value {
    let Some((part, remaining)) = parts.split_first() else {
        return json.clone();
    };

    match json {
        Value::Object(map) => match map.get(*part) {
            Some(value) => extract_by_parts(value, remaining),
            None => Value::Null,
        },
        Value::Array(arr) => {
            // When we hit an array, extract from each item and collect results
            let mut results: Vec<Value> = arr
                .iter()
                .map(|item| extract_by_parts(item, parts))
                .filter(|v| !v.is_null())
                .collect();

            match results.len() {
                0 => Value::Null,
                1 => results.remove(0),
                _ => Value::Array(results),
            }
        }
        _ => Value::Null,
    }
}

/// Insert a value at a path, creating intermediate objects as needed.
///
/// Non-object values found on the way are replaced by objects.
pub fn insert_by_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let parts = split_path(path);
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = target;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        };
    }
    current.insert(last.to_string(), value);
}

/// Extract a cursor string at `path`, treating empty strings as absent
pub fn extract_cursor(json: &Value, path: &str) -> Option<String> {
    extract_by_path(json, path)
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Convert a JSON value to a short display string
pub fn value_to_string(value: &Value, default: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => default.to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| value_to_string(v, default))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Navigate through the AWS query-protocol response wrapper.
///
/// Responses typically look like `{ "ActionResponse": { "ActionResult": { ... } } }`
/// or, for EC2, `{ "ActionResponse": { ... } }`. Returns the innermost payload.
pub fn unwrap_query_response(json: &Value) -> Option<Value> {
    let Value::Object(map) = json else {
        return None;
    };
    let (_, response_value) = map.iter().next()?;
    let Value::Object(inner_map) = response_value else {
        return Some(response_value.clone());
    };

    inner_map
        .iter()
        .find(|(key, _)| key.ends_with("Result"))
        .map(|(_, value)| value.clone())
        .or_else(|| Some(response_value.clone()))
}
