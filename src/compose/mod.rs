//! Document composition subsystem.
//!
//! # Data Flow
//! ```text
//! upstream outbounds (JSON)
//!     → template.rs (working copy of template, outbound prepended)
//!     → mux.rs (mux block on vless proxy outbounds)
//!     → prune.rs (drop empty structure)
//!     → region.rs (regional rule filter, credential patch)
//!     → client documents
//! ```
//!
//! # Design Decisions
//! - The template is immutable and shared; composition always works on a copy
//! - All walkers share one visitor over `serde_json::Value` (walk.rs)
//! - Missing optional structure is never an error, only a skipped rewrite

pub mod mux;
pub mod prune;
pub mod region;
pub mod template;
pub mod walk;

use thiserror::Error;

pub use mux::MuxInjector;
pub use prune::{prune, pruned};
pub use region::{find_host_by_remark, patch_region_outbound, strip_region_rules};
pub use template::{decode_outbounds, ConfigTemplate, TemplateComposer};

/// Tag every upstream outbound is renamed to.
pub const PROXY_TAG: &str = "proxy";

/// Protocol that receives the mux block.
pub const MUX_PROTOCOL: &str = "vless";

/// Routing rules pointing at this outbound tag are regional.
pub const REGION_OUTBOUND_TAG: &str = "RU";

/// Errors raised while decoding documents for composition.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid JSON document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("expected an outbound array, found {0}")]
    NotAnArray(&'static str),

    #[error("document has no outbounds")]
    MissingOutbounds,
}
