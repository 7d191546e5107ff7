//! Panel API payloads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The panel wraps every JSON payload in `{"response": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

/// Subscription owner as reported by the panel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "nullable")]
    pub short_uuid: String,
    #[serde(deserialize_with = "nullable")]
    pub days_left: i64,
    #[serde(deserialize_with = "nullable")]
    pub traffic_used: String,
    #[serde(deserialize_with = "nullable")]
    pub traffic_limit: String,
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    #[serde(deserialize_with = "nullable")]
    pub expires_at: String,
    #[serde(deserialize_with = "nullable")]
    pub is_active: bool,
    #[serde(deserialize_with = "nullable")]
    pub user_status: String,
    #[serde(deserialize_with = "nullable")]
    pub traffic_limit_strategy: String,
}

/// Response of the `/info` endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionInfo {
    #[serde(deserialize_with = "nullable")]
    pub is_found: bool,
    #[serde(deserialize_with = "nullable")]
    pub user: User,
    #[serde(deserialize_with = "nullable")]
    pub links: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub ss_conf_links: serde_json::Map<String, Value>,
    #[serde(deserialize_with = "nullable")]
    pub subscription_url: String,
}

/// Per-protocol secrets. Only the field for the host's protocol is set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostPassword {
    #[serde(deserialize_with = "nullable")]
    pub vless_password: String,
    #[serde(deserialize_with = "nullable")]
    pub trojan_password: String,
    #[serde(deserialize_with = "nullable")]
    pub ss_password: String,
}

/// One upstream connection endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawHost {
    #[serde(deserialize_with = "nullable")]
    pub protocol: String,
    #[serde(deserialize_with = "nullable")]
    pub network: String,
    #[serde(deserialize_with = "nullable")]
    pub tls: String,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub port: u16,
    #[serde(deserialize_with = "nullable")]
    pub remark: String,
    pub path: Option<String>,
    pub host: Option<String>,
    pub sni: Option<String>,
    pub alpn: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub password: HostPassword,
    pub public_key: Option<String>,
    pub short_id: Option<String>,
    pub fingerprint: Option<String>,
    pub spider_x: Option<String>,
    pub flow: Option<String>,
    /// Traffic accounting strategy reported for the host, if any.
    pub traffic_strategy: Option<String>,
}

/// Response of the `/raw` endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSubscription {
    #[serde(deserialize_with = "nullable")]
    pub user: User,
    #[serde(deserialize_with = "nullable")]
    pub raw_hosts: Vec<RawHost>,
}
