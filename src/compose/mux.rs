//! Multiplexing block injection.

use serde_json::{Map, Value};

use crate::compose::walk::{walk_mut, Visitor};
use crate::compose::{MUX_PROTOCOL, PROXY_TAG};

/// Attaches the configured `mux` block to proxy outbounds at any depth.
#[derive(Debug, Clone)]
pub struct MuxInjector {
    template: Value,
}

impl MuxInjector {
    pub fn new(template: Value) -> Self {
        Self { template }
    }

    /// Set `mux` on every map with `tag == "proxy"` and `protocol == "vless"`.
    pub fn inject(&self, document: &mut Value) {
        walk_mut(document, &mut MuxVisitor { template: &self.template });
    }
}

struct MuxVisitor<'a> {
    template: &'a Value,
}

impl Visitor for MuxVisitor<'_> {
    fn visit_map(&mut self, map: &mut Map<String, Value>) {
        let is_proxy = map.get("tag").and_then(Value::as_str) == Some(PROXY_TAG);
        let is_target = map.get("protocol").and_then(Value::as_str) == Some(MUX_PROTOCOL);
        if is_proxy && is_target {
            map.insert("mux".to_string(), self.template.clone());
        }
    }
}
