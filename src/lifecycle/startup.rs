//! Startup orchestration.
//!
//! # Responsibilities
//! - Read the configuration template, mux template and status page once
//! - Reject malformed assets before the listener is bound
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The mux template is only read when mux is enabled

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::compose::{ComposeError, ConfigTemplate};
use crate::config::AppConfig;

/// Immutable assets shared by every request.
#[derive(Debug, Clone)]
pub struct Assets {
    pub template: ConfigTemplate,
    pub mux: Option<Value>,
    pub web_page: String,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: ComposeError,
    },

    #[error("invalid mux template {path}: {source}")]
    Mux {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read(path: &Path) -> Result<String, StartupError> {
    std::fs::read_to_string(path).map_err(|source| StartupError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every asset named by the configuration.
pub fn load_assets(config: &AppConfig) -> Result<Assets, StartupError> {
    let paths = &config.templates;

    let template_path = Path::new(&paths.v2ray_template_path);
    let template = ConfigTemplate::from_json(&read(template_path)?).map_err(|source| {
        StartupError::Template {
            path: template_path.to_path_buf(),
            source,
        }
    })?;

    let mux = if config.mux.enabled {
        let mux_path = Path::new(&paths.mux_template_path);
        let mux = serde_json::from_str(&read(mux_path)?).map_err(|source| StartupError::Mux {
            path: mux_path.to_path_buf(),
            source,
        })?;
        Some(mux)
    } else {
        None
    };

    let web_page = read(Path::new(&paths.web_page_template_path))?;

    tracing::info!(
        template = %paths.v2ray_template_path,
        mux_enabled = mux.is_some(),
        web_page = %paths.web_page_template_path,
        "Assets loaded"
    );

    Ok(Assets {
        template,
        mux,
        web_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "subscription-composer-{}-{}",
            uuid::Uuid::new_v4(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn config_with(template: &Path, mux: &Path, page: &Path, mux_enabled: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.templates.v2ray_template_path = template.display().to_string();
        config.templates.mux_template_path = mux.display().to_string();
        config.templates.web_page_template_path = page.display().to_string();
        config.mux.enabled = mux_enabled;
        config
    }

    #[test]
    fn test_loads_assets() {
        let template = write_temp("t.json", r#"{"outbounds": [{"tag": "direct"}]}"#);
        let mux = write_temp("m.json", r#"{"enabled": true, "concurrency": 8}"#);
        let page = write_temp("p.html", "<title>{{.MetaTitle}}</title>");

        let assets = load_assets(&config_with(&template, &mux, &page, true)).unwrap();
        assert_eq!(assets.mux.unwrap()["concurrency"], 8);
        assert!(assets.web_page.contains("{{.MetaTitle}}"));
    }

    #[test]
    fn test_mux_skipped_when_disabled() {
        let template = write_temp("t.json", "{}");
        let page = write_temp("p.html", "");
        let missing = Path::new("/nonexistent/mux.json");

        let assets = load_assets(&config_with(&template, missing, &page, false)).unwrap();
        assert!(assets.mux.is_none());
    }

    #[test]
    fn test_template_must_be_object() {
        let template = write_temp("t.json", "[1, 2]");
        let page = write_temp("p.html", "");

        let err = load_assets(&config_with(&template, &template, &page, false)).unwrap_err();
        assert!(matches!(err, StartupError::Template { .. }));
    }

    #[test]
    fn test_missing_page() {
        let template = write_temp("t.json", "{}");
        let missing = Path::new("/nonexistent/index.html");

        let err = load_assets(&config_with(&template, missing, missing, false)).unwrap_err();
        assert!(matches!(err, StartupError::Read { .. }));
    }
}
