//! Subscription config composition service library.

pub mod compose;
pub mod config;
pub mod convert;
pub mod http;
pub mod lifecycle;
pub mod links;
pub mod observability;
pub mod panel;
pub mod routing;
pub mod subscription;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use subscription::SubscriptionService;
