//! Subscription config composition service.
//!
//! Sits between VPN client apps and the panel. Each request for
//! `/{short_uuid}` is classified by user-agent and answered with composed
//! JSON configs, the panel's raw feed, or a status page.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (request id, proxy guard)
//!                         │
//!                         ▼
//!                     routing (classifier) ──▶ variant
//!                         │
//!                         ▼
//!                     subscription service
//!                       ├─ panel client ◀────────────▶ Panel API
//!                       ├─ links → compose (template, mux, prune, region)
//!                       ├─ convert (full balancer config)
//!                       └─ status page
//!                         │
//!     Client Response     ▼
//!     ◀────────────── response (filtered headers, error mapping)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use subscription_composer::config::load_config;
use subscription_composer::http::HttpServer;
use subscription_composer::lifecycle::{load_assets, signals, Shutdown};
use subscription_composer::links::ShareLinkConverter;
use subscription_composer::observability::{logging, metrics};
use subscription_composer::panel::PanelClient;
use subscription_composer::subscription::SubscriptionService;

#[derive(Debug, Parser)]
#[command(name = "subscription-composer", version, about)]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Validate configuration and templates, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_tracing(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "subscription-composer starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        panel_url = %config.panel.url,
        strategy = ?config.composition.strategy,
        mux_enabled = config.mux.enabled,
        happ_json = config.happ.json_enabled,
        "Configuration loaded"
    );

    let assets = load_assets(&config)?;
    if cli.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let panel = PanelClient::new(&config.panel)?;
    let service = SubscriptionService::new(
        panel,
        Arc::new(ShareLinkConverter::new()),
        assets,
        &config,
    );

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(&config, service);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
