//! Request handlers.
//!
//! # Responsibilities
//! - Validate the short user id
//! - Classify the client and dispatch to the subscription service
//! - Attach Happ headers and record request metrics
//!
//! # Design Decisions
//! - Non-GET requests to the subscription path are always relayed
//! - Happ headers are attached whatever the variant, errors included

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::HappConfig;
use crate::http::request::request_id;
use crate::http::response::relayable_response_headers;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::panel::UpstreamResponse;
use crate::routing::{ClientFamily, ResponseVariant};
use crate::subscription::Rendered;

/// Short user ids are opaque tokens made of these characters only.
pub fn valid_short_uuid(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Static headers sent to Happ clients.
pub fn happ_headers(config: &HappConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let announce = config
        .announcements
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(|text| format!("base64:{}", STANDARD.encode(text)));
    let routing = config
        .routing
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    for (name, value) in [("announce", announce), ("routing", routing)] {
        let Some(value) = value else { continue };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => tracing::warn!(header = name, error = %e, "Ignoring invalid Happ header value"),
        }
    }
    headers
}

fn json_response(rendered: Rendered) -> Response {
    let mut response = (rendered.status, rendered.body).into_response();
    let headers = response.headers_mut();
    headers.extend(rendered.headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn relay_response(upstream: UpstreamResponse<Bytes>) -> Response {
    let UpstreamResponse {
        status,
        headers,
        body,
    } = upstream;
    let mut response = (status, body).into_response();
    *response.headers_mut() = relayable_response_headers(&headers);
    response
}

fn invalid_id(short_uuid: &str) -> Response {
    tracing::warn!(short_uuid, "Rejected malformed subscription id");
    (StatusCode::BAD_REQUEST, "invalid subscription id").into_response()
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// `/{short_uuid}`: classified dispatch.
pub async fn subscription(
    State(state): State<AppState>,
    Path(short_uuid): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    if !valid_short_uuid(&short_uuid) {
        return invalid_id(&short_uuid);
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let negotiation = state.classifier.classify(user_agent);
    let variant = if method == Method::GET {
        negotiation.variant
    } else {
        ResponseVariant::Direct
    };

    let service = &state.service;
    let agent = Some(user_agent).filter(|ua| !ua.is_empty());
    let result = match variant {
        ResponseVariant::Structured => service.structured(&short_uuid, agent).await.map(json_response),
        ResponseVariant::StatusPage => service
            .status_page(&short_uuid, agent)
            .await
            .map(|page| Html(page).into_response()),
        ResponseVariant::Direct => service
            .passthrough(&short_uuid, method, &headers, body)
            .await
            .map(relay_response),
    };
    let mut response = result.unwrap_or_else(IntoResponse::into_response);

    if negotiation.identity.family == ClientFamily::Happ {
        for (name, value) in state.happ_headers.iter() {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }

    let status = response.status();
    metrics::record_request(variant.as_str(), status.as_u16(), start);
    tracing::info!(
        request_id = %request_id(&headers),
        short_uuid = %short_uuid,
        family = negotiation.identity.family.as_str(),
        version = negotiation.identity.version.as_deref().unwrap_or("-"),
        variant = variant.as_str(),
        status = status.as_u16(),
        "Subscription served"
    );
    response
}

/// `/{short_uuid}/v2ray-json`: the panel's document with region walkers.
pub async fn v2ray_json(
    State(state): State<AppState>,
    Path(short_uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    if !valid_short_uuid(&short_uuid) {
        return invalid_id(&short_uuid);
    }

    let response = match state.service.upstream_v2ray_json(&short_uuid, &headers).await {
        Ok(rendered) => json_response(rendered),
        Err(e) => e.into_response(),
    };
    metrics::record_request("v2ray_json", response.status().as_u16(), start);
    response
}

/// `/{short_uuid}/balancer`: full config built from raw hosts.
pub async fn balancer(
    State(state): State<AppState>,
    Path(short_uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    if !valid_short_uuid(&short_uuid) {
        return invalid_id(&short_uuid);
    }

    let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok());
    let response = match state.service.full_config(&short_uuid, user_agent).await {
        Ok(rendered) => json_response(rendered),
        Err(e) => e.into_response(),
    };
    metrics::record_request("full_config", response.status().as_u16(), start);
    response
}
