//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM/SIGINT
//! - First signal: drain, wait `drain_duration`, shut down
//! - Second signal while draining: skip the rest of the drain and shut down

use crate::lifecycle::server::Server;
use crate::lifecycle::shutdown::ShutdownReport;

/// Start the server and run it until the process is asked to stop.
pub async fn run_until_signal(mut server: Server) -> ShutdownReport {
    server.run_in_background().await;

    wait_for_signal().await;
    tracing::info!("Shutdown signal received");

    tokio::select! {
        report = server.drain_and_shutdown() => report,
        _ = wait_for_signal() => {
            tracing::warn!("Second shutdown signal received, skipping drain");
            server.shutdown().await
        }
    }
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
