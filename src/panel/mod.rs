//! Upstream panel integration.
//!
//! # Data Flow
//! ```text
//! short user id
//!     → client.rs (GET /api/sub/{id}[/info|/raw|/v2ray-json])
//!     → types.rs (envelope decoding)
//!     → SubscriptionInfo / RawSubscription / filtered headers
//! ```
//!
//! # Design Decisions
//! - Every call carries a bounded timeout
//! - Non-success statuses are errors, except on the passthrough path
//! - No retries and no caching between requests

pub mod client;
pub mod types;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::{PanelClient, UpstreamResponse};
pub use types::{HostPassword, RawHost, RawSubscription, SubscriptionInfo, User};

/// Errors that can occur while talking to the panel.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Connection, timeout or body read failure.
    #[error("panel request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Panel answered with a non-success status.
    #[error("panel returned {status} for {endpoint}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// Panel answered with a body we could not decode.
    #[error("malformed {endpoint} payload: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PanelError {
    /// Whether the failure was the upstream timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PanelError::Request(e) if e.is_timeout())
    }
}

/// Result type for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;
