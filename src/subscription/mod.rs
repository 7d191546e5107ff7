//! Subscription orchestration.
//!
//! # Data Flow
//! ```text
//! short user id + negotiated variant
//!     → service.rs (panel calls, run concurrently where independent)
//!         Structured/template: info links → links → compose → region walkers
//!         Structured/full:     raw hosts  → convert
//!         StatusPage:          info       → page.rs
//!         Direct:              byte-for-byte relay
//!     → handlers (serialization, headers, metrics)
//! ```
//!
//! # Design Decisions
//! - Every request is all-or-nothing: one failed step fails the request
//! - The panel's 404 surfaces as our 404; other panel failures are 502/504

pub mod page;
pub mod service;

use thiserror::Error;

use crate::compose::ComposeError;
use crate::convert::ConvertError;
use crate::links::LinkError;
use crate::panel::PanelError;

pub use page::StatusPage;
pub use service::{Rendered, SubscriptionService};

/// Errors surfaced to HTTP handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Panel(PanelError),

    #[error("subscription not found")]
    NotFound,

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("failed to encode response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<PanelError> for ServiceError {
    fn from(e: PanelError) -> Self {
        match e {
            PanelError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND => {
                ServiceError::NotFound
            }
            other => ServiceError::Panel(other),
        }
    }
}
