//! Metrics collection and exposition.
//!
//! # Metrics
//! - `subscription_requests_total` (counter): requests by variant, status
//! - `subscription_request_duration_seconds` (histogram): latency by variant
//! - `panel_requests_total` (counter): panel calls by endpoint, outcome
//! - `panel_request_duration_seconds` (histogram): panel latency by endpoint
//!
//! # Design Decisions
//! - Labels are bounded: variants, endpoints and outcomes are fixed strings
//! - The exporter is optional; recording without it is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one handled subscription request.
pub fn record_request(variant: &'static str, status: u16, start: Instant) {
    counter!(
        "subscription_requests_total",
        "variant" => variant,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("subscription_request_duration_seconds", "variant" => variant)
        .record(start.elapsed().as_secs_f64());
}

/// Record one call to the panel.
pub fn record_panel_request(endpoint: &'static str, outcome: &'static str, start: Instant) {
    counter!(
        "panel_requests_total",
        "endpoint" => endpoint,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("panel_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}
