//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Root configuration for the subscription service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, public host).
    pub listener: ListenerConfig,

    /// Upstream panel API.
    pub panel: PanelConfig,

    /// Template and page asset locations.
    pub templates: TemplatesConfig,

    /// Structured config composition settings.
    pub composition: CompositionConfig,

    /// Multiplexing injection.
    pub mux: MuxConfig,

    /// Happ client headers.
    pub happ: HappConfig,

    /// Regional rule filtering and outbound patching.
    pub region: RegionConfig,

    /// Status page metadata.
    pub page: PageConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host part of the bind address. `localhost` disables the proxy guard.
    pub host: String,

    /// Port part of the bind address.
    pub port: u16,
}

impl ListenerConfig {
    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether requests must arrive through an HTTPS-terminating reverse proxy.
    pub fn requires_proxy_headers(&self) -> bool {
        self.host != "localhost"
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4000,
        }
    }
}

/// Panel API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL of the panel (e.g., "https://panel.example.com").
    pub url: String,

    /// Optional bearer token sent with every panel request.
    pub token: Option<String>,

    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,

    /// Local mode: pretend to be behind an HTTPS proxy when talking to the panel.
    pub local_mode: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: None,
            timeout_secs: 10,
            local_mode: false,
        }
    }
}

/// Asset file locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Client configuration template (JSON).
    pub v2ray_template_path: String,

    /// Mux settings template (JSON), read only when mux is enabled.
    pub mux_template_path: String,

    /// Status page HTML template.
    pub web_page_template_path: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            v2ray_template_path: "/app/templates/v2ray/default.json".to_string(),
            mux_template_path: "/app/templates/mux/default.json".to_string(),
            web_page_template_path: "/app/templates/subscription/index.html".to_string(),
        }
    }
}

/// How structured-config clients get their documents.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStrategy {
    /// Merge every upstream outbound into the local template.
    #[default]
    Template,
    /// Build a self-contained balancer config from raw hosts.
    FullConfig,
}

impl std::str::FromStr for CompositionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "full_config" | "full-config" | "balancer" => Ok(Self::FullConfig),
            other => Err(format!("unknown composition strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CompositionConfig {
    pub strategy: CompositionStrategy,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MuxConfig {
    /// Attach the mux template to proxy outbounds.
    pub enabled: bool,
}

/// Happ-specific response headers.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HappConfig {
    /// Serve structured configs to Happ instead of the raw feed.
    pub json_enabled: bool,

    /// Value of the `routing` response header.
    pub routing: Option<String>,

    /// Plain announcement text, sent base64-encoded in the `announce` header.
    pub announcements: Option<String>,
}

/// Regional overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegionConfig {
    /// Tag of the outbound whose credentials are patched.
    pub outbound_name: Option<String>,

    /// Remark of the raw host supplying the credentials.
    pub host_remark: Option<String>,

    /// Short user ids whose regional rules are removed.
    pub except_rules_users: HashSet<String>,
}

impl RegionConfig {
    /// Both names are needed before the outbound patch can run.
    pub fn patch_target(&self) -> Option<(&str, &str)> {
        match (self.outbound_name.as_deref(), self.host_remark.as_deref()) {
            (Some(outbound), Some(remark)) if !outbound.is_empty() && !remark.is_empty() => {
                Some((outbound, remark))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PageConfig {
    pub meta_title: String,
    pub meta_description: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
