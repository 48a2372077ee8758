//! Path arithmetic and write semantics shared by the in-memory store and the
//! streaming client's local mirror.

use serde_json::{Map, Value};

pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

pub fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');

    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

pub fn value_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = match node {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    (!node.is_null()).then_some(node)
}

/// Writes `value` under `segments`, creating parents on the way. Null and
/// empty containers delete, and parents left empty are pruned.
pub fn write(root: &mut Value, segments: &[&str], value: Value) {
    let value = normalize(value);
    if value.is_null() && value_at(root, segments).is_none() {
        return;
    }

    write_normalized(root, segments, value);
}

/// Drops nulls and empty containers, recursively.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .filter(|(_, value)| !value.is_null())
                .collect();

            if map.is_empty() { Value::Null } else { Value::Object(map) }
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().map(normalize).collect();

            if items.iter().all(Value::is_null) { Value::Null } else { Value::Array(items) }
        }
        other => other,
    }
}

fn write_normalized(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let map = as_object(node);
    if rest.is_empty() {
        if value.is_null() {
            map.remove(*head);
        } else {
            map.insert((*head).to_string(), value);
        }
    } else {
        let child = map.entry((*head).to_string()).or_insert(Value::Null);
        write_normalized(child, rest, value);
        if child.is_null() {
            map.remove(*head);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

/// Arrays become index-keyed objects once written into, like the store does.
fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        let converted = match node.take() {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
            _ => Map::new(),
        };
        *node = Value::Object(converted);
    }

    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was converted to an object"),
    }
}
