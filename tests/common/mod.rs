//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Request, http::StatusCode, response::IntoResponse, response::Response};
use futures_util::future::BoxFuture;
use key_service_server::config::Config;
use key_service_server::http::{KeyOperation, KeyService};
use key_service_server::Server;

/// Key service that sleeps for a fixed delay and echoes the operation name.
pub struct SleepyKeyService {
    delay: Duration,
    calls: AtomicU64,
}

impl SleepyKeyService {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicU64::new(0),
        })
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl KeyService for SleepyKeyService {
    fn handle(&self, operation: KeyOperation, _request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            (StatusCode::OK, operation.route_name()).into_response()
        })
    }
}

/// Both listeners on ephemeral ports, one-second shutdown budget.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.service_name = "itest".into();
    config.server.listen_addr = "127.0.0.1:0".into();
    config.server.metrics_addr = "127.0.0.1:0".into();
    config.server.graceful_shutdown_ms = 1_000;
    config.server.drain_duration_ms = 0;
    config.server.write_timeout_ms = 60_000;
    config
}

/// Build and start a server.
pub async fn start_server(config: Config, key_service: Arc<dyn KeyService>) -> Server {
    let mut server = Server::new(config, key_service).expect("server construction failed");
    server.run_in_background().await;
    assert!(server.api_addr().is_some(), "API listener did not start");
    server
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn api_url(server: &Server, path: &str) -> String {
    format!("http://{}{}", server.api_addr().unwrap(), path)
}

#[allow(dead_code)]
pub fn metrics_url(server: &Server) -> String {
    format!("http://{}/metrics", server.metrics_addr().unwrap())
}
