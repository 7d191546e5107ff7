//! Typed client configuration produced by the full-config converter.
//!
//! Field declaration order is the serialized order, which keeps generated
//! documents stable and diffable.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XrayConfig {
    pub log: LogConfig,
    pub dns: DnsConfig,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub routing: RoutingConfig,
    pub observatory: Observatory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogConfig {
    pub loglevel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    pub servers: Vec<DnsServer>,
    pub query_strategy: String,
}

/// A resolver: either a bare address or one restricted to some domains.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DnsServer {
    Default(String),
    Conditional(ConditionalDns),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalDns {
    pub address: String,
    pub domains: Vec<String>,
    pub skip_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inbound {
    pub tag: String,
    pub listen: String,
    pub port: u16,
    pub protocol: String,
    pub settings: InboundSettings,
    pub sniffing: Sniffing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sniffing {
    pub enabled: bool,
    pub dest_override: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    pub tag: String,
    pub protocol: String,
    pub settings: OutboundSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundSettings {
    Vless { vnext: Vec<VnextServer> },
    Freedom {
        #[serde(rename = "domainStrategy")]
        domain_strategy: String,
    },
    Empty {},
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VnextServer {
    pub address: String,
    pub port: u16,
    pub users: Vec<VlessUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlessUser {
    pub id: String,
    pub encryption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    pub network: String,
    pub security: String,
    pub reality_settings: RealitySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealitySettings {
    pub server_name: String,
    pub fingerprint: String,
    pub public_key: String,
    pub short_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub domain_strategy: String,
    pub rules: Vec<RoutingRule>,
    pub balancers: Vec<Balancer>,
}

/// Where a matching rule sends traffic. Exactly one per rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleTarget {
    OutboundTag(String),
    BalancerTag(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Vec<String>>,
    #[serde(flatten)]
    pub target: RuleTarget,
}

impl RoutingRule {
    pub fn new(target: RuleTarget) -> Self {
        Self {
            rule_type: "field".to_string(),
            inbound_tag: None,
            domain: None,
            ip: None,
            port: None,
            protocol: None,
            target,
        }
    }

    pub fn to_outbound(tag: &str) -> Self {
        Self::new(RuleTarget::OutboundTag(tag.to_string()))
    }

    pub fn to_balancer(tag: &str) -> Self {
        Self::new(RuleTarget::BalancerTag(tag.to_string()))
    }

    pub fn domains(mut self, domains: &[&str]) -> Self {
        self.domain = Some(strings(domains));
        self
    }

    pub fn ips(mut self, ips: &[&str]) -> Self {
        self.ip = Some(strings(ips));
        self
    }

    pub fn port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    pub fn protocols(mut self, protocols: &[&str]) -> Self {
        self.protocol = Some(strings(protocols));
        self
    }

    pub fn inbound_tags(mut self, tags: &[&str]) -> Self {
        self.inbound_tag = Some(strings(tags));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balancer {
    pub tag: String,
    pub selector: Vec<String>,
    pub strategy: BalancerStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancerStrategy {
    #[serde(rename = "type")]
    pub kind: String,
}

impl BalancerStrategy {
    pub fn round_robin() -> Self {
        Self {
            kind: "roundRobin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observatory {
    pub subject_selector: Vec<String>,
    pub probe_url: String,
    pub probe_interval: String,
    pub enable_concurrency: bool,
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
