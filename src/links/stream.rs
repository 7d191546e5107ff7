//! Transport and security settings shared by vless and trojan links.

use serde_json::{json, Map, Value};

use crate::links::LinkParams;

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn transport(params: &LinkParams, network: &str) -> Option<(&'static str, Value)> {
    let path = params.get("path");
    let host = params.get("host");
    match network {
        "tcp" | "raw" => Some((
            "tcpSettings",
            json!({ "header": { "type": params.get("headerType") } }),
        )),
        "ws" => Some((
            "wsSettings",
            json!({ "path": path, "headers": { "Host": host } }),
        )),
        "grpc" => Some((
            "grpcSettings",
            json!({
                "serviceName": params.get("serviceName"),
                "authority": params.get("authority"),
                "multiMode": params.get("mode") == "multi",
            }),
        )),
        "httpupgrade" => Some(("httpupgradeSettings", json!({ "path": path, "host": host }))),
        "xhttp" | "splithttp" => Some((
            "xhttpSettings",
            json!({ "path": path, "host": host, "mode": params.get("mode") }),
        )),
        _ => None,
    }
}

/// Build `streamSettings` from link parameters.
pub fn stream_settings(params: &LinkParams, default_security: &str) -> Value {
    let network = params.get_or("type", "tcp");
    let security = params.get_or("security", default_security);

    let mut stream = Map::new();
    stream.insert("network".into(), json!(network));
    stream.insert("security".into(), json!(security));

    match security {
        "tls" => {
            stream.insert(
                "tlsSettings".into(),
                json!({
                    "serverName": params.get("sni"),
                    "fingerprint": params.get("fp"),
                    "alpn": split_list(params.get("alpn")),
                    "allowInsecure": params.get("allowInsecure") == "1",
                }),
            );
        }
        "reality" => {
            stream.insert(
                "realitySettings".into(),
                json!({
                    "serverName": params.get("sni"),
                    "fingerprint": params.get("fp"),
                    "publicKey": params.get("pbk"),
                    "shortId": params.get("sid"),
                    "spiderX": params.get("spx"),
                }),
            );
        }
        _ => {}
    }

    if let Some((key, settings)) = transport(params, network) {
        stream.insert(key.into(), settings);
    }

    Value::Object(stream)
}
