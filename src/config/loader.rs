//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => {
                write!(f, "Invalid value '{}' for environment variable {}", value, key)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests never touch process state.
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("REMNAWAVE_URL") {
        config.panel.url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = get("REMNAWAVE_TOKEN") {
        config.panel.token = Some(v);
    }
    if let Some(v) = get("MODE") {
        config.panel.local_mode = v == "local";
    }
    if let Some(v) = get("APP_HOST") {
        config.listener.host = v;
    }
    if let Some(v) = get("APP_PORT") {
        config.listener.port = parse_env("APP_PORT", v)?;
    }
    if let Some(v) = get("V2RAY_TEMPLATE_PATH") {
        config.templates.v2ray_template_path = v;
    }
    if let Some(v) = get("V2RAY_MUX_TEMPLATE_PATH") {
        config.templates.mux_template_path = v;
    }
    if let Some(v) = get("WEB_PAGE_TEMPLATE_PATH") {
        config.templates.web_page_template_path = v;
    }
    if let Some(v) = get("V2RAY_MUX_ENABLED") {
        config.mux.enabled = v == "true";
    }
    if let Some(v) = get("HAPP_JSON_ENABLED") {
        config.happ.json_enabled = v == "true";
    }
    if let Some(v) = get("HAPP_ROUTING") {
        config.happ.routing = Some(v);
    }
    if let Some(v) = get("HAPP_ANNOUNCEMENTS") {
        config.happ.announcements = Some(v);
    }
    if let Some(v) = get("RU_OUTBOUND_NAME") {
        config.region.outbound_name = Some(v);
    }
    if let Some(v) = get("RU_USER_HOST") {
        config.region.host_remark = Some(v);
    }
    if let Some(v) = get("EXCEPT_RU_RULES_USERS") {
        config.region.except_rules_users = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(v) = get("META_TITLE") {
        config.page.meta_title = v;
    }
    if let Some(v) = get("META_DESCRIPTION") {
        config.page.meta_description = v;
    }
    if let Some(v) = get("COMPOSITION_STRATEGY") {
        config.composition.strategy = parse_env("COMPOSITION_STRATEGY", v)?;
    }

    Ok(())
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { key, value })
}
