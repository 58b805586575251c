//! Pure operations over the JSON document tree shared by both backends.

use serde_json::{Map, Value};

use crate::batch::SERVER_VALUE_KEY;

/// Null and `{}` are how the tree spells "nothing here".
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Strip null members and empty objects; `None` if nothing remains.
pub(crate) fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

pub(crate) fn get_at<'a>(node: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = node;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if is_empty(current) {
        None
    } else {
        Some(current)
    }
}

/// Write or delete the value at `segments` below `node`.
///
/// Writes create missing intermediate objects and replace scalars in the
/// way.  Deletes prune parents left empty.
pub(crate) fn set_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    match value {
        None => {
            let Value::Object(map) = node else {
                return;
            };
            if let Some(child) = map.get_mut(head) {
                set_at(child, rest, None);
                if is_empty(child) {
                    map.remove(head);
                }
            }
        }
        Some(value) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                let child = map.entry(head.clone()).or_insert(Value::Null);
                set_at(child, rest, Some(value));
            }
        }
    }
}

/// Replace every server-value sentinel with the commit time.
pub(crate) fn resolve_server_values(value: &mut Value, now_ms: i64) {
    match value {
        Value::Object(map) => {
            if is_timestamp_sentinel(map) {
                *value = Value::from(now_ms);
                return;
            }
            for child in map.values_mut() {
                resolve_server_values(child, now_ms);
            }
        }
        Value::Array(items) => {
            for child in items {
                resolve_server_values(child, now_ms);
            }
        }
        _ => {}
    }
}

fn is_timestamp_sentinel(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp")
}
