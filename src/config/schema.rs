//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Durations are whole milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the key service server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Service name, attached to every metric and to the root log span.
    pub service_name: String,

    /// Listeners, timeouts and the debug switch.
    pub server: ServerConfig,

    /// Latency histogram layout.
    pub metrics: MetricsConfig,

    /// Log level and format.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "key-service".to_string(),
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Listener and lifecycle settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API listener bind address (e.g., "127.0.0.1:8080").
    pub listen_addr: String,

    /// Metrics listener bind address. Empty disables the metrics listener.
    pub metrics_addr: String,

    /// Mount the `/debug` diagnostic routes.
    pub enable_debug: bool,

    /// How long callers should wait after draining before shutting down.
    /// Only `Server::drain_and_shutdown` honours it; `Server::shutdown` does not.
    pub drain_duration_ms: u64,

    /// Per-listener budget for a graceful stop.
    pub graceful_shutdown_ms: u64,

    /// Upper bound for reading request headers.
    pub read_timeout_ms: u64,

    /// Upper bound for producing a response.
    pub write_timeout_ms: u64,
}

impl ServerConfig {
    pub fn metrics_enabled(&self) -> bool {
        !self.metrics_addr.is_empty()
    }

    pub fn drain_duration(&self) -> Duration {
        Duration::from_millis(self.drain_duration_ms)
    }

    pub fn graceful_shutdown(&self) -> Duration {
        Duration::from_millis(self.graceful_shutdown_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            metrics_addr: "127.0.0.1:8090".to_string(),
            enable_debug: false,
            drain_duration_ms: 45_000,
            graceful_shutdown_ms: 30_000,
            read_timeout_ms: 60_000,
            write_timeout_ms: 30_000,
        }
    }
}

/// Metrics settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Upper bounds of the request latency buckets, in microseconds.
    pub latency_buckets_us: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_buckets_us: vec![
                100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0,
                100_000.0, 250_000.0, 500_000.0, 1_000_000.0, 2_500_000.0, 5_000_000.0,
            ],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
