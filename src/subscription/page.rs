//! Status page rendering for browsers.
//!
//! The page template carries Go-style placeholders (`{{.MetaTitle}}`,
//! `{{.MetaDescription}}`, `{{.PanelData}}`). PanelData is the base64 of
//! `{"response": <subscription info>}`; the page script decodes it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;

use crate::config::PageConfig;
use crate::panel::SubscriptionInfo;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn substitute(page: String, name: &str, value: &str) -> String {
    page.replace(&format!("{{{{.{}}}}}", name), value)
        .replace(&format!("{{{{ .{} }}}}", name), value)
}

#[derive(Debug, Clone)]
pub struct StatusPage {
    template: String,
    meta_title: String,
    meta_description: String,
}

impl StatusPage {
    pub fn new(template: String, meta: &PageConfig) -> Self {
        Self {
            template,
            meta_title: escape_html(&meta.meta_title),
            meta_description: escape_html(&meta.meta_description),
        }
    }

    pub fn render(&self, info: &SubscriptionInfo) -> Result<String, serde_json::Error> {
        let payload = serde_json::to_vec(&json!({ "response": info }))?;
        let panel_data = STANDARD.encode(payload);

        let page = substitute(self.template.clone(), "MetaTitle", &self.meta_title);
        let page = substitute(page, "MetaDescription", &self.meta_description);
        Ok(substitute(page, "PanelData", &panel_data))
    }
}
