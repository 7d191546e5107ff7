pub mod proxy_guard;

pub use proxy_guard::proxy_guard;
