//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port != 0)
//! - Check that the panel URL is usable as a base for API paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("panel.url is required")]
    MissingPanelUrl,

    #[error("panel.url '{0}' is not an http(s) URL")]
    InvalidPanelUrl(String),

    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("templates.{0} must not be empty")]
    EmptyTemplatePath(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.panel.url.trim().is_empty() {
        errors.push(ValidationError::MissingPanelUrl);
    } else {
        match url::Url::parse(&config.panel.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::InvalidPanelUrl(config.panel.url.clone())),
        }
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.panel.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("panel.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if config.templates.v2ray_template_path.is_empty() {
        errors.push(ValidationError::EmptyTemplatePath("v2ray_template_path"));
    }
    if config.templates.web_page_template_path.is_empty() {
        errors.push(ValidationError::EmptyTemplatePath("web_page_template_path"));
    }
    if config.mux.enabled && config.templates.mux_template_path.is_empty() {
        errors.push(ValidationError::EmptyTemplatePath("mux_template_path"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
