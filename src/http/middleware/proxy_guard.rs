//! Reverse-proxy guard.
//!
//! When the service listens on a public host it must sit behind an
//! HTTPS-terminating reverse proxy. Requests that did not come through one
//! (no `X-Forwarded-For`, or `X-Forwarded-Proto` other than `https`) are
//! rejected with 403.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;

/// Whether the headers show an HTTPS reverse proxy in front of us.
pub fn forwarded_over_https(headers: &HeaderMap) -> bool {
    let has_forwarded_for = headers
        .get("x-forwarded-for")
        .is_some_and(|v| !v.is_empty());
    let proto_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|p| p.trim().eq_ignore_ascii_case("https"));
    has_forwarded_for && proto_https
}

pub async fn proxy_guard(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if state.require_proxy_headers && !forwarded_over_https(req.headers()) {
        tracing::warn!(
            path = %req.uri().path(),
            "Rejected request without HTTPS reverse proxy headers"
        );
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(req).await
}
