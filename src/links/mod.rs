//! Share-link to outbound conversion.
//!
//! # Responsibilities
//! - Parse `vless://`, `trojan://` and `ss://` share links
//! - Produce `{"outbounds": [outbound]}` documents for the template composer
//! - Carry the link's remark in the outbound's `sendThrough` field
//!
//! # Design Decisions
//! - Unset link parameters become empty strings; the pruner removes them
//! - Conversion sits behind [`LinkConverter`] so the subscription service can
//!   be driven by another converter in tests

pub mod shadowsocks;
pub mod stream;

use std::collections::HashMap;

use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use stream::stream_settings;

/// Errors that can occur while converting a share link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unsupported share link scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid share link: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{scheme} link has no {field}")]
    MissingField {
        scheme: &'static str,
        field: &'static str,
    },

    #[error("invalid shadowsocks credentials: {0}")]
    InvalidShadowsocks(String),
}

/// Converts one share link into an outbound document.
pub trait LinkConverter: Send + Sync {
    /// Returns `{"outbounds": [outbound]}`.
    fn convert(&self, link: &str) -> Result<Value, LinkError>;
}

/// Query parameters of a share link. Missing keys read as "".
#[derive(Debug, Default)]
pub struct LinkParams(HashMap<String, String>);

impl LinkParams {
    pub fn from_url(url: &Url) -> Self {
        Self(url.query_pairs().into_owned().collect())
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            "" => default,
            value => value,
        }
    }
}

/// Host, port and remark common to URL-shaped links.
pub(crate) struct Endpoint {
    pub address: String,
    pub port: u16,
    pub remark: String,
}

impl Endpoint {
    pub(crate) fn from_url(url: &Url, scheme: &'static str) -> Result<Self, LinkError> {
        let address = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(LinkError::MissingField {
                scheme,
                field: "host",
            })?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port().ok_or(LinkError::MissingField {
            scheme,
            field: "port",
        })?;
        Ok(Self {
            address,
            port,
            remark: url.fragment().map(decode).unwrap_or_default(),
        })
    }
}

pub(crate) fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn credential(url: &Url, scheme: &'static str, field: &'static str) -> Result<String, LinkError> {
    match url.username() {
        "" => Err(LinkError::MissingField { scheme, field }),
        user => Ok(decode(user)),
    }
}

/// Converter for the share-link formats the panel emits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareLinkConverter;

impl ShareLinkConverter {
    pub fn new() -> Self {
        Self
    }

    fn vless(&self, url: &Url) -> Result<Value, LinkError> {
        let id = credential(url, "vless", "user id")?;
        let endpoint = Endpoint::from_url(url, "vless")?;
        let params = LinkParams::from_url(url);

        Ok(json!({
            "protocol": "vless",
            "sendThrough": endpoint.remark,
            "settings": {
                "vnext": [{
                    "address": endpoint.address,
                    "port": endpoint.port,
                    "users": [{
                        "id": id,
                        "encryption": params.get_or("encryption", "none"),
                        "flow": params.get("flow"),
                    }],
                }],
            },
            "streamSettings": stream_settings(&params, "none"),
        }))
    }

    fn trojan(&self, url: &Url) -> Result<Value, LinkError> {
        let password = credential(url, "trojan", "password")?;
        let endpoint = Endpoint::from_url(url, "trojan")?;
        let params = LinkParams::from_url(url);

        Ok(json!({
            "protocol": "trojan",
            "sendThrough": endpoint.remark,
            "settings": {
                "servers": [{
                    "address": endpoint.address,
                    "port": endpoint.port,
                    "password": password,
                    "flow": params.get("flow"),
                }],
            },
            "streamSettings": stream_settings(&params, "tls"),
        }))
    }
}

impl LinkConverter for ShareLinkConverter {
    fn convert(&self, link: &str) -> Result<Value, LinkError> {
        let link = link.trim();
        let scheme = link
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();

        let outbound = match scheme.as_str() {
            "vless" => self.vless(&Url::parse(link)?)?,
            "trojan" => self.trojan(&Url::parse(link)?)?,
            "ss" => shadowsocks::convert(link)?,
            _ => return Err(LinkError::UnsupportedScheme(scheme)),
        };

        Ok(json!({ "outbounds": [outbound] }))
    }
}
