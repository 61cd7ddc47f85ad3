use serde_json::{Map, Value};

/// Navigate a dotted path (e.g. "reset.environment") in a memory object.
pub fn path_get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Read a boolean value at a dotted path, defaulting to `false`.
pub fn path_bool(root: &Value, path: &str) -> bool {
    path_get(root, path).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Read an f64 value at a dotted path.
pub fn path_f64(root: &Value, path: &str) -> Option<f64> {
    path_get(root, path).and_then(|v| v.as_f64())
}

/// Set a value at a dotted path, creating intermediate objects. Non-object intermediates
/// are replaced.
pub fn path_set(root: &mut Value, path: &str, value: impl Into<Value>) {
    let parts: Vec<&str> = path.split('.').collect();
    let (last_key, parents) = match parts.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = root;
    for key in parents {
        current = object_mut(current).entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    }

    object_mut(current).insert(last_key.to_string(), value.into());
}

/// Delete the value at a dotted path.
pub fn path_del(root: &mut Value, path: &str) {
    let parts: Vec<&str> = path.split('.').collect();
    let (last_key, parents) = match parts.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = root;
    for key in parents {
        current = match current.as_object_mut().and_then(|o| o.get_mut(*key)) {
            Some(next) => next,
            None => return,
        };
    }

    if let Some(object) = current.as_object_mut() {
        object.remove(*last_key);
    }
}

/// Fill in every key of `defaults` that is missing from `target`, recursively.
pub fn defaults_deep(target: &mut Value, defaults: &Value) {
    if let (Some(target), Some(defaults)) = (target.as_object_mut(), defaults.as_object()) {
        for (key, default) in defaults {
            match target.get_mut(key) {
                Some(existing) => defaults_deep(existing, default),
                None => {
                    target.insert(key.clone(), default.clone());
                }
            }
        }
    }
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }

    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_objects() {
        let mut root = json!({});

        path_set(&mut root, "reset.memory", true);

        assert!(path_bool(&root, "reset.memory"));
        assert!(!path_bool(&root, "reset.environment"));
    }

    #[test]
    fn defaults_do_not_overwrite() {
        let mut root = json!({ "paving": { "on": false } });

        defaults_deep(&mut root, &json!({ "paving": { "on": true, "limit": 60 }, "spawn": { "mute": false } }));

        assert!(!path_bool(&root, "paving.on"));
        assert_eq!(path_f64(&root, "paving.limit"), Some(60.0));
        assert!(path_get(&root, "spawn.mute").is_some());
    }

    #[test]
    fn delete_missing_path_is_noop() {
        let mut root = json!({ "a": 1 });

        path_del(&mut root, "b.c");
        path_del(&mut root, "a");

        assert_eq!(root, json!({}));
    }
}
