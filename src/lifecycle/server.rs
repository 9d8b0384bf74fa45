//! The server: owns the configuration, readiness flag, metrics registry
//! and the two listeners.
//!
//! # Lifecycle
//! ```text
//! Server::new            validate config, init metrics, build routers
//! run_in_background      start metrics upkeep, metrics listener (if configured),
//!                        then API listener
//! drain_and_shutdown     readiness = false, wait drain_duration, shutdown
//! shutdown               stop API listener, then metrics listener, each bounded;
//!                        then stop metrics upkeep
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span};

use crate::config::{validate_config, Config, ConfigError};
use crate::error::ServerError;
use crate::health::ReadinessFlag;
use crate::http::keyservice::KeyService;
use crate::http::router::{build_router, RouterContext};
use crate::net::listener::{ListenerHandle, ServeOptions};
use crate::observability::metrics::{MetricsRegistry, UPKEEP_INTERVAL};

pub(crate) const API_LISTENER: &str = "api";
pub(crate) const METRICS_LISTENER: &str = "metrics";

/// Lifecycle controller for the API and metrics listeners.
pub struct Server {
    pub(crate) config: Arc<Config>,
    readiness: ReadinessFlag,
    metrics: MetricsRegistry,
    api_router: Router,
    metrics_router: Router,
    pub(crate) api: Option<ListenerHandle>,
    pub(crate) metrics_listener: Option<ListenerHandle>,
    pub(crate) upkeep: Option<JoinHandle<()>>,
    pub(crate) span: Span,
}

impl Server {
    /// Validate `config`, initialize metrics and build the routers.
    ///
    /// No socket is bound until [`Server::run_in_background`].
    pub fn new(config: Config, key_service: Arc<dyn KeyService>) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let metrics = MetricsRegistry::new(&config.service_name, &config.metrics)?;
        let readiness = ReadinessFlag::new();
        let config = Arc::new(config);
        let span = tracing::info_span!("service", name = %config.service_name);

        let api_router = span.in_scope(|| {
            build_router(RouterContext {
                config: Arc::clone(&config),
                key_service,
                readiness: readiness.clone(),
                metrics: metrics.clone(),
                started_at: Instant::now(),
            })
        });
        let metrics_router = metrics.router();

        Ok(Self {
            config,
            readiness,
            metrics,
            api_router,
            metrics_router,
            api: None,
            metrics_listener: None,
            upkeep: None,
            span,
        })
    }

    /// Start both listeners as supervised background tasks.
    ///
    /// A listener that fails to bind is logged and left stopped; the other
    /// one is unaffected. Listeners that are already running are left alone.
    /// Metrics upkeep starts first and runs even without a metrics listener.
    pub async fn run_in_background(&mut self) {
        if self.upkeep.is_none() {
            let _entered = self.span.enter();
            tracing::debug!(interval_ms = UPKEEP_INTERVAL.as_millis() as u64, "Starting metrics upkeep");
            self.upkeep = Some(self.metrics.spawn_upkeep(UPKEEP_INTERVAL));
        }

        let config = Arc::clone(&self.config);
        let server = &config.server;
        let options = ServeOptions {
            read_timeout: server.read_timeout(),
        };

        if server.metrics_enabled() && self.metrics_listener.is_none() {
            self.metrics_listener = start_listener(
                METRICS_LISTENER,
                &server.metrics_addr,
                self.metrics_router.clone(),
                options,
            )
            .instrument(self.span.clone())
            .await;
        }

        if self.api.is_none() {
            self.api = start_listener(
                API_LISTENER,
                &server.listen_addr,
                self.api_router.clone(),
                options,
            )
            .instrument(self.span.clone())
            .await;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the readiness flag shared with the health endpoints.
    pub fn readiness(&self) -> ReadinessFlag {
        self.readiness.clone()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Bound address of the API listener, if it is running.
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api.as_ref().map(ListenerHandle::local_addr)
    }

    /// Bound address of the metrics listener, if it is running.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_listener.as_ref().map(ListenerHandle::local_addr)
    }

    /// True while the periodic metrics upkeep task is running.
    pub fn metrics_upkeep_running(&self) -> bool {
        self.upkeep.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(task) = self.upkeep.take() {
            task.abort();
        }
    }
}

async fn start_listener(
    name: &'static str,
    address: &str,
    router: Router,
    options: ServeOptions,
) -> Option<ListenerHandle> {
    tracing::info!(listener = name, address, "Starting listener");
    match ListenerHandle::start(name, address, router, options).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(listener = name, address, error = %e, "HTTP server failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::keyservice::UnavailableKeyService;

    fn config() -> Config {
        let mut config = Config::default();
        config.server.listen_addr = "127.0.0.1:0".into();
        config.server.metrics_addr = "127.0.0.1:0".into();
        config
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let mut config = config();
        config.server.graceful_shutdown_ms = 0;
        let err = Server::new(config, Arc::new(UnavailableKeyService)).err().unwrap();
        assert!(matches!(err, ServerError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn bad_bucket_layout_is_a_metrics_error() {
        for buckets in [Vec::new(), vec![500.0, 100.0]] {
            let mut config = config();
            config.metrics.latency_buckets_us = buckets;
            let err = Server::new(config, Arc::new(UnavailableKeyService)).err().unwrap();
            assert!(matches!(err, ServerError::Metrics(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn metrics_upkeep_runs_without_metrics_listener() {
        let mut config = config();
        config.server.metrics_addr = String::new();
        let mut server = Server::new(config, Arc::new(UnavailableKeyService)).unwrap();
        assert!(!server.metrics_upkeep_running());

        server.run_in_background().await;
        assert_eq!(server.metrics_addr(), None);
        assert!(server.metrics_upkeep_running());

        server.shutdown().await;
        assert!(!server.metrics_upkeep_running());
    }

    #[test]
    fn construction_binds_nothing() {
        let server = Server::new(config(), Arc::new(UnavailableKeyService)).unwrap();
        assert!(server.readiness().get());
        assert_eq!(server.api_addr(), None);
        assert_eq!(server.metrics_addr(), None);
    }

    #[tokio::test]
    async fn bind_failure_leaves_other_listener_running() {
        let mut config = config();
        config.server.listen_addr = "203.0.113.1:1".into();
        let mut server = Server::new(config, Arc::new(UnavailableKeyService)).unwrap();

        server.run_in_background().await;
        assert_eq!(server.api_addr(), None);
        assert!(server.metrics_addr().is_some());

        let report = server.shutdown().await;
        assert!(report.is_clean());
    }
}
