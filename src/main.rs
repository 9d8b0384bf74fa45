//! Key service server.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                 KEY SERVICE SERVER                    │
//!                 │                                                       │
//!  API client ────┼─▶ api listener ─▶ router ─▶ access log ─▶ latency ──┼──▶ key service
//!                 │                     │                    histogram  │
//!  Orchestrator ──┼─▶ /livez /readyz ───┤                        │       │
//!  Operator ──────┼─▶ /drain /undrain ──┘                        │       │
//!                 │          │                                   ▼       │
//!                 │     readiness flag                     metrics registry
//!                 │                                              │       │
//!  Prometheus ────┼─▶ metrics listener ─▶ /metrics ◀─────────────┘       │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! SIGTERM/SIGINT drains the instance, waits `drain_duration_ms`, then stops
//! the API listener and the metrics listener in that order.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use key_service_server::config::{load_config, Config};
use key_service_server::http::UnavailableKeyService;
use key_service_server::lifecycle::{run_until_signal, Server};
use key_service_server::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "key-service-server")]
#[command(about = "HTTP server for the key service", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.listen_addr`.
    #[arg(long)]
    listen_addr: Option<String>,

    /// Override `server.metrics_addr`. Pass an empty string to disable.
    #[arg(long)]
    metrics_addr: Option<String>,

    /// Mount the /debug diagnostic routes.
    #[arg(long)]
    enable_debug: bool,

    /// Log JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(addr) = self.listen_addr {
            config.server.listen_addr = addr;
        }
        if let Some(addr) = self.metrics_addr {
            config.server.metrics_addr = addr;
        }
        config.server.enable_debug |= self.enable_debug;
        config.logging.json |= self.log_json;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    let config = match args.config.take() {
        Some(path) => load_config(&path)?,
        None => Config::default(),
    };
    let config = args.apply(config);

    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_address = %config.server.listen_addr,
        metrics_address = %config.server.metrics_addr,
        enable_debug = config.server.enable_debug,
        drain_ms = config.server.drain_duration_ms,
        graceful_shutdown_ms = config.server.graceful_shutdown_ms,
        "Configuration loaded"
    );

    let server = Server::new(config, Arc::new(UnavailableKeyService))?;
    let report = run_until_signal(server).await;

    if report.is_clean() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!(?report, "Shutdown completed with errors");
    }
    Ok(())
}
