//! Panel HTTP client with timeout and error handling.
//!
//! # Responsibilities
//! - Build panel API URLs keyed by short user id
//! - Attach the bearer token and local-mode forwarding headers
//! - Decode JSON envelopes, filter subscription headers
//! - Forward raw requests for the passthrough path
//!
//! No retries: a failed call fails the request that made it.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::PanelConfig;
use crate::http::response::{forwardable_request_headers, subscription_headers};
use crate::observability::metrics;
use crate::panel::types::{Envelope, RawSubscription, SubscriptionInfo};
use crate::panel::{PanelError, PanelResult};

/// Upstream response relayed to the client.
#[derive(Debug, Clone)]
pub struct UpstreamResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: T,
}

/// Client for the panel's subscription API.
#[derive(Debug, Clone)]
pub struct PanelClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    local_mode: bool,
}

impl PanelClient {
    /// Create a client from configuration.
    pub fn new(config: &PanelConfig) -> PanelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            local_mode: config.local_mode,
        })
    }

    fn url(&self, short_uuid: &str, suffix: &str) -> String {
        format!("{}/api/sub/{}{}", self.base_url, short_uuid, suffix)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if self.local_mode {
            builder = builder
                .header("x-forwarded-for", "127.0.0.1")
                .header("x-forwarded-proto", "https");
        }
        builder
    }

    async fn send(
        &self,
        endpoint: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> PanelResult<reqwest::Response> {
        let start = Instant::now();
        let result = builder.send().await;

        let outcome = match &result {
            Ok(resp) if resp.status().is_success() => "ok",
            Ok(_) => "status",
            Err(e) if e.is_timeout() => "timeout",
            Err(_) => "error",
        };
        metrics::record_panel_request(endpoint, outcome, start);

        let resp = result.map_err(|e| {
            tracing::error!(endpoint, error = %e, "Panel request failed");
            PanelError::Request(e)
        })?;

        if !resp.status().is_success() {
            tracing::error!(endpoint, status = %resp.status(), url = %resp.url(), "Panel returned non-success status");
            return Err(PanelError::Status {
                endpoint,
                status: resp.status(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> PanelResult<T> {
        let resp = self.send(endpoint, builder).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| PanelError::Decode { endpoint, source })
    }

    /// `GET /api/sub/{id}/info`: user metadata and share links.
    pub async fn subscription_info(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> PanelResult<SubscriptionInfo> {
        let builder = self
            .request(Method::GET, &self.url(short_uuid, "/info"))
            .header(CONTENT_TYPE, "application/json");
        let envelope: Envelope<SubscriptionInfo> =
            self.get_json("info", with_user_agent(builder, user_agent)).await?;
        Ok(envelope.response)
    }

    /// `GET /api/sub/{id}/raw`: raw host descriptors.
    pub async fn raw_subscription(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> PanelResult<RawSubscription> {
        let builder = self.request(Method::GET, &self.url(short_uuid, "/raw"));
        let envelope: Envelope<RawSubscription> =
            self.get_json("raw", with_user_agent(builder, user_agent)).await?;
        Ok(envelope.response)
    }

    /// `GET /api/sub/{id}`, keeping only the subscription headers.
    pub async fn subscription_headers(
        &self,
        short_uuid: &str,
        user_agent: Option<&str>,
    ) -> PanelResult<HeaderMap> {
        let builder = self
            .request(Method::GET, &self.url(short_uuid, ""))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8");
        let resp = self.send("subscription", with_user_agent(builder, user_agent)).await?;
        Ok(subscription_headers(resp.headers()))
    }

    /// `GET /api/sub/{id}/v2ray-json` with the client's headers forwarded.
    pub async fn v2ray_json(
        &self,
        short_uuid: &str,
        headers: &HeaderMap,
    ) -> PanelResult<UpstreamResponse<Value>> {
        let builder = self
            .request(Method::GET, &self.url(short_uuid, "/v2ray-json"))
            .headers(forwardable_request_headers(headers));
        let resp = self.send("v2ray_json", builder).await?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let body = serde_json::from_slice(&bytes).map_err(|source| PanelError::Decode {
            endpoint: "v2ray_json",
            source,
        })?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    /// Relay a request to `/api/sub/{id}` and return whatever the panel says,
    /// including non-success statuses.
    pub async fn forward(
        &self,
        short_uuid: &str,
        method: Method,
        headers: &HeaderMap,
        body: Bytes,
    ) -> PanelResult<UpstreamResponse<Bytes>> {
        let start = Instant::now();
        let result = self
            .request(method, &self.url(short_uuid, ""))
            .headers(forwardable_request_headers(headers))
            .body(body)
            .send()
            .await;
        metrics::record_panel_request(
            "passthrough",
            if result.is_ok() { "ok" } else { "error" },
            start,
        );

        let resp = result.map_err(|e| {
            tracing::error!(error = %e, "Passthrough request failed");
            PanelError::Request(e)
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_user_agent(builder: reqwest::RequestBuilder, user_agent: Option<&str>) -> reqwest::RequestBuilder {
    match user_agent.and_then(|ua| HeaderValue::from_str(ua).ok()) {
        Some(value) => builder.header(USER_AGENT, value),
        None => builder,
    }
}
