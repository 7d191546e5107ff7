//! Generic visitor over JSON documents.
//!
//! `serde_json::Value` is the tagged union (map / sequence / scalar) every
//! walker operates on. Rewrites happen parent-before-children: a visitor sees
//! a map before the walk descends into the (possibly rewritten) children.

use serde_json::{Map, Value};

/// Callback invoked for every object node reachable from the root.
pub trait Visitor {
    fn visit_map(&mut self, map: &mut Map<String, Value>);
}

impl<F> Visitor for F
where
    F: FnMut(&mut Map<String, Value>),
{
    fn visit_map(&mut self, map: &mut Map<String, Value>) {
        self(map)
    }
}

/// Depth-first, pre-order walk over every map and sequence under `node`.
pub fn walk_mut<V: Visitor + ?Sized>(node: &mut Value, visitor: &mut V) {
    match node {
        Value::Object(map) => {
            visitor.visit_map(map);
            for child in map.values_mut() {
                walk_mut(child, visitor);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                walk_mut(item, visitor);
            }
        }
        _ => {}
    }
}
