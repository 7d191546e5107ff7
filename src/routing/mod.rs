//! Client routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming User-Agent
//!     → classifier.rs (ordered pattern table)
//!     → matcher.rs (prefix / keyword checks, version capture)
//!     → version.rs (threshold comparison)
//!     → Return: Negotiation { identity, variant }
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same variant
//! - First match wins (declaration order is priority)

pub mod classifier;
pub mod matcher;
pub mod version;

pub use classifier::{Classifier, ClientFamily, ClientIdentity, Negotiation, ResponseVariant};
pub use version::compare_versions;
