//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, proxy guard)
//! - Serve on a listener until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::middleware::proxy_guard;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::routing::Classifier;
use crate::subscription::SubscriptionService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SubscriptionService>,
    pub classifier: Arc<Classifier>,
    pub happ_headers: Arc<HeaderMap>,
    pub require_proxy_headers: bool,
}

impl AppState {
    pub fn new(config: &AppConfig, service: SubscriptionService) -> Self {
        Self {
            service: Arc::new(service),
            classifier: Arc::new(Classifier::new(config.happ.json_enabled)),
            happ_headers: Arc::new(handlers::happ_headers(&config.happ)),
            require_proxy_headers: config.listener.requires_proxy_headers(),
        }
    }
}

/// HTTP server for the subscription endpoints.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &AppConfig, service: SubscriptionService) -> Self {
        let state = AppState::new(config, service);
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let subscriptions = Router::new()
            .route("/{short_uuid}", any(handlers::subscription))
            .route("/{short_uuid}/v2ray-json", get(handlers::v2ray_json))
            .route("/{short_uuid}/balancer", get(handlers::balancer))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                proxy_guard,
            ));

        Router::new()
            .route("/healthz", get(handlers::healthz))
            .merge(subscriptions)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                path = %request.uri().path(),
                                request_id = %request_id(request.headers()),
                            )
                        },
                    ))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            )
    }

    /// The configured router, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ConfigTemplate;
    use crate::config::PanelConfig;
    use crate::lifecycle::Assets;
    use crate::links::ShareLinkConverter;
    use crate::panel::PanelClient;
    use tower::ServiceExt;

    fn router(host: &str) -> Router {
        let mut config = AppConfig::default();
        config.listener.host = host.to_string();
        config.panel.url = "http://127.0.0.1:9".to_string();

        let panel = PanelClient::new(&PanelConfig {
            url: config.panel.url.clone(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        let assets = Assets {
            template: ConfigTemplate::from_json("{}").unwrap(),
            mux: None,
            web_page: String::new(),
        };
        let service =
            SubscriptionService::new(panel, Arc::new(ShareLinkConverter::new()), assets, &config);
        HttpServer::new(&config, service).into_router()
    }

    #[tokio::test]
    async fn test_healthz_has_request_id() {
        let response = router("localhost")
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_proxy_guard_on_public_host() {
        let response = router("0.0.0.0")
            .oneshot(Request::get("/abc123").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router("0.0.0.0")
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_id_rejected() {
        let response = router("localhost")
            .oneshot(Request::get("/bad%20id/balancer").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
