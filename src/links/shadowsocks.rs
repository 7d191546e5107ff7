//! `ss://` links in both the SIP002 and the legacy all-base64 form.
//!
//! Userinfo is split off by hand: standard base64 may contain `/`, which a
//! URL parser would take as the end of the authority.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{json, Value};
use url::Url;

use crate::links::{decode, Endpoint, LinkError};

fn decode_base64(raw: &str) -> Option<String> {
    let raw = raw.trim();
    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(raw).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// `method:password`, either plain or base64 encoded.
fn credentials(userinfo: &str) -> Result<(String, String), LinkError> {
    let plain = if userinfo.contains(':') {
        userinfo.to_string()
    } else {
        decode_base64(userinfo)
            .ok_or_else(|| LinkError::InvalidShadowsocks("userinfo is not base64".into()))?
    };
    plain
        .split_once(':')
        .filter(|(method, password)| !method.is_empty() && !password.is_empty())
        .map(|(method, password)| (method.to_string(), password.to_string()))
        .ok_or_else(|| LinkError::InvalidShadowsocks("expected method:password".into()))
}

/// Convert `ss://base64(method:password)@host:port#remark` or the legacy
/// `ss://base64(method:password@host:port)#remark` into an outbound.
pub fn convert(link: &str) -> Result<Value, LinkError> {
    let body = link.split_once("://").map(|(_, b)| b).unwrap_or(link);
    let (main, fragment) = match body.split_once('#') {
        Some((main, fragment)) => (main, Some(fragment)),
        None => (body, None),
    };

    let (userinfo, server) = match main.rsplit_once('@') {
        Some((userinfo, server)) => (decode(userinfo), server.to_string()),
        None => {
            let decoded = decode_base64(main)
                .ok_or_else(|| LinkError::InvalidShadowsocks("link body is not base64".into()))?;
            let (userinfo, server) = decoded
                .rsplit_once('@')
                .ok_or_else(|| LinkError::InvalidShadowsocks("missing '@'".into()))?;
            (userinfo.to_string(), server.to_string())
        }
    };
    let (method, password) = credentials(&userinfo)?;

    let mut rebuilt = format!("ss://{}", server);
    if let Some(fragment) = fragment {
        rebuilt.push('#');
        rebuilt.push_str(fragment);
    }
    let endpoint = Endpoint::from_url(&Url::parse(&rebuilt)?, "ss")?;

    Ok(json!({
        "protocol": "shadowsocks",
        "sendThrough": endpoint.remark,
        "settings": {
            "servers": [{
                "address": endpoint.address,
                "port": endpoint.port,
                "method": method,
                "password": password,
            }],
        },
        "streamSettings": { "network": "tcp" },
    }))
}
