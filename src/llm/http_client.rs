use reqwest::Client;
use std::time::Duration;

/// Shared client for provider calls.
///
/// `timeout_secs` bounds the whole request including the body read.
pub fn build_backend_client(timeout_secs: u64) -> Client {
    Client::builder()
        .user_agent(concat!("tonegate/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {e}");
            Client::new()
        })
}
