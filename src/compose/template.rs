//! Template composition.
//!
//! Every upstream outbound produces one client document: a fresh copy of the
//! shared template with that outbound prepended to `outbounds`.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compose::mux::MuxInjector;
use crate::compose::prune::prune;
use crate::compose::{ComposeError, PROXY_TAG};

/// Client configuration template shared by all requests.
///
/// The document is never handed out by reference; callers get their own
/// working copy to mutate.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    document: Arc<Map<String, Value>>,
}

impl ConfigTemplate {
    pub fn new(document: Map<String, Value>) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    /// Parse a template from JSON text. The root must be an object.
    pub fn from_json(text: &str) -> Result<Self, ComposeError> {
        match serde_json::from_str::<Value>(text).map_err(ComposeError::Decode)? {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(ComposeError::NotAnObject(value_kind(&other))),
        }
    }

    /// Deep copy of the template for one request.
    pub fn working_copy(&self) -> Map<String, Value> {
        (*self.document).clone()
    }
}

/// Merges upstream outbounds into a template.
#[derive(Debug, Clone)]
pub struct TemplateComposer {
    template: ConfigTemplate,
    mux: Option<MuxInjector>,
}

impl TemplateComposer {
    pub fn new(template: ConfigTemplate, mux: Option<MuxInjector>) -> Self {
        Self { template, mux }
    }

    /// Decode an outbound set (a JSON array of objects) and compose it.
    pub fn compose_value(&self, outbounds: Value) -> Result<Vec<Value>, ComposeError> {
        let outbounds = decode_outbounds(outbounds)?;
        Ok(self.compose(outbounds))
    }

    /// Build one pruned document per outbound, in input order.
    pub fn compose(&self, outbounds: Vec<Map<String, Value>>) -> Vec<Value> {
        outbounds
            .into_iter()
            .map(|outbound| self.compose_one(outbound))
            .collect()
    }

    fn compose_one(&self, mut outbound: Map<String, Value>) -> Value {
        let mut document = self.template.working_copy();

        if let Some(Value::String(remark)) = outbound.shift_remove("sendThrough") {
            document.insert("remarks".to_string(), Value::String(escape_remark(&remark)));
        }

        outbound.insert("tag".to_string(), Value::String(PROXY_TAG.to_string()));

        let mut outbound = Value::Object(outbound);
        if let Some(mux) = &self.mux {
            mux.inject(&mut outbound);
        }

        match document.get_mut("outbounds") {
            Some(Value::Array(existing)) => existing.insert(0, outbound),
            _ => {
                document.insert("outbounds".to_string(), Value::Array(vec![outbound]));
            }
        }

        let mut document = Value::Object(document);
        prune(&mut document);
        document
    }
}

/// Accept `[{...}, ...]` or a `{"outbounds": [...]}` wrapper.
pub fn decode_outbounds(value: Value) -> Result<Vec<Map<String, Value>>, ComposeError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.shift_remove("outbounds") {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(ComposeError::NotAnArray(value_kind(&other))),
            None => return Err(ComposeError::MissingOutbounds),
        },
        other => return Err(ComposeError::NotAnArray(value_kind(&other))),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(ComposeError::NotAnObject(value_kind(&other))),
        })
        .collect()
}

/// JSON string-literal escaping without the surrounding quotes.
pub fn escape_remark(remark: &str) -> String {
    match serde_json::to_string(remark) {
        Ok(quoted) => quoted[1..quoted.len() - 1].to_string(),
        Err(_) => PROXY_TAG.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
