//! Full-config conversion.
//!
//! # Data Flow
//! ```text
//! raw hosts (panel /raw)
//!     → full_config.rs (validate first two, build proxy outbounds)
//!     → fixed DNS, inbounds, routing, balancer, observatory
//!     → model.rs (typed document, serialized in declaration order)
//! ```
//!
//! # Design Decisions
//! - Only VLESS over TCP with REALITY is accepted; any other host fails
//!   the whole conversion
//! - The document is built from typed structs, not patched JSON

pub mod full_config;
pub mod model;

use std::fmt;

use thiserror::Error;

pub use full_config::{build_full_config, render_full_config, MAX_BALANCED_HOSTS};
pub use model::XrayConfig;

/// Host property checked during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostConstraint {
    Protocol,
    Tls,
    Network,
}

impl fmt::Display for HostConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostConstraint::Protocol => write!(f, "protocol"),
            HostConstraint::Tls => write!(f, "tls"),
            HostConstraint::Network => write!(f, "network"),
        }
    }
}

/// Errors raised while converting raw hosts into a full config.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("subscription has no hosts")]
    NoHosts,

    /// `index` is 1-based.
    #[error("host #{index}: unsupported {constraint} '{found}', expected '{expected}'")]
    UnsupportedHost {
        index: usize,
        constraint: HostConstraint,
        expected: &'static str,
        found: String,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
