//! Response handling and header transformation.
//!
//! # Responsibilities
//! - Select the subscription headers echoed from the panel
//! - Strip hop-by-hop headers in both directions
//! - Map engine errors to HTTP status codes
//!
//! # Design Decisions
//! - Hop-by-hop and framing headers are never relayed; axum sets its own
//! - Accept-Encoding is dropped upstream so the panel client decodes bodies
//! - Upstream timeouts result in 504 Gateway Timeout

use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::subscription::ServiceError;

/// Panel headers that describe the subscription to client apps.
pub const SUBSCRIPTION_HEADERS: [&str; 5] = [
    "profile-title",
    "profile-update-interval",
    "subscription-userinfo",
    "profile-web-page-url",
    "content-disposition",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Keep only [`SUBSCRIPTION_HEADERS`], with all their values.
pub fn subscription_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for name in SUBSCRIPTION_HEADERS {
        for value in upstream.get_all(name) {
            filtered.append(HeaderName::from_static(name), value.clone());
        }
    }
    filtered
}

/// Client request headers that may be sent on to the panel.
pub fn forwardable_request_headers(client: &HeaderMap) -> HeaderMap {
    client
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name)
                && *name != header::HOST
                && *name != header::CONTENT_LENGTH
                && *name != header::ACCEPT_ENCODING
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Panel response headers that may be relayed to the client.
pub fn relayable_response_headers(upstream: &HeaderMap) -> HeaderMap {
    upstream
        .iter()
        .filter(|(name, _)| {
            !is_hop_by_hop(name)
                && *name != header::CONTENT_LENGTH
                && *name != header::CONTENT_ENCODING
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Panel(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Panel(crate::panel::PanelError::Decode { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Panel(_) => StatusCode::BAD_GATEWAY,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Link(_)
            | ServiceError::Compose(_)
            | ServiceError::Convert(_)
            | ServiceError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, status = %status, "Subscription request failed");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_subscription_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert("profile-title", HeaderValue::from_static("base64:VGVzdA=="));
        upstream.insert("subscription-userinfo", HeaderValue::from_static("upload=0; download=1"));
        upstream.insert("x-powered-by", HeaderValue::from_static("panel"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let filtered = subscription_headers(&upstream);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered["profile-title"], "base64:VGVzdA==");
        assert!(filtered.get("x-powered-by").is_none());
    }

    #[test]
    fn test_request_header_forwarding() {
        let mut client = HeaderMap::new();
        client.insert(header::HOST, HeaderValue::from_static("sub.example.com"));
        client.insert(header::USER_AGENT, HeaderValue::from_static("v2rayNG/1.9.0"));
        client.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        client.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let forwarded = forwardable_request_headers(&client);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[header::USER_AGENT], "v2rayNG/1.9.0");
    }

    #[test]
    fn test_response_header_relay() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let relayed = relayable_response_headers(&upstream);
        assert_eq!(relayed.len(), 1);
        assert!(relayed.contains_key(header::CONTENT_TYPE));
    }
}
