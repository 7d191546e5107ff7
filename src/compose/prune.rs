//! Recursive removal of empty structure.
//!
//! A value is "empty" when it is `null`, `""`, numeric zero, `{}` or `[]`.
//! Pruning is bottom-up, so a map whose children all disappear becomes
//! empty itself and is removed from its parent in the same pass. That makes
//! `prune(prune(x)) == prune(x)`.

use serde_json::Value;

/// Prune `value` in place. The root itself is never removed.
pub fn prune(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, child| {
                prune(child);
                !is_empty(child)
            });
        }
        Value::Array(items) => {
            items.retain_mut(|item| {
                prune(item);
                !is_empty(item)
            });
        }
        _ => {}
    }
}

/// Owned convenience wrapper around [`prune`].
pub fn pruned(mut value: Value) -> Value {
    prune(&mut value);
    value
}

/// Whether a value would be dropped by its parent.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) => false,
    }
}
