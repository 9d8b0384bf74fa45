//! Ordered, time-bounded shutdown.
//!
//! The API listener is stopped first and the metrics listener second, so
//! metrics stay scrapeable while API traffic winds down. Each stage gets
//! its own `graceful_shutdown` budget; a failed stage is logged and does
//! not prevent the next one. Metrics upkeep stops last, after a final pass.

use std::time::Duration;

use tracing::Instrument;

use crate::lifecycle::server::{Server, API_LISTENER, METRICS_LISTENER};
use crate::net::listener::{ListenerHandle, StopError};

/// Outcome of stopping one listener.
#[derive(Debug)]
pub enum StageOutcome {
    /// Stopped within the budget.
    Stopped,
    /// There was nothing to stop (disabled, never started or failed to bind).
    NotRunning,
    /// In-flight work outlived the budget; the listener was force-closed.
    TimedOut { abandoned: u64 },
    /// The listener had failed earlier or its task crashed.
    Failed(StopError),
}

impl StageOutcome {
    /// True unless the stage timed out or failed.
    pub fn is_clean(&self) -> bool {
        matches!(self, StageOutcome::Stopped | StageOutcome::NotRunning)
    }
}

/// Per-listener outcomes of [`Server::shutdown`].
#[derive(Debug)]
pub struct ShutdownReport {
    pub api: StageOutcome,
    pub metrics: StageOutcome,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.api.is_clean() && self.metrics.is_clean()
    }
}

impl Server {
    /// Stop the API listener, then the metrics listener.
    ///
    /// Each stop is bounded by `server.graceful_shutdown_ms`. Outcomes are
    /// logged independently and returned; nothing here panics or retries.
    /// This does not wait for `drain_duration`; see
    /// [`Server::drain_and_shutdown`].
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let timeout = self.config.server.graceful_shutdown();

        let api = stop_stage(API_LISTENER, self.api.take(), timeout)
            .instrument(self.span.clone())
            .await;
        let metrics = if self.config.server.metrics_enabled() {
            stop_stage(METRICS_LISTENER, self.metrics_listener.take(), timeout)
                .instrument(self.span.clone())
                .await
        } else {
            StageOutcome::NotRunning
        };

        if let Some(task) = self.upkeep.take() {
            task.abort();
            self.metrics().run_upkeep();
            tracing::debug!(parent: &self.span, "Metrics upkeep stopped");
        }

        ShutdownReport { api, metrics }
    }

    /// Take the process out of traffic, give load balancers `drain_duration`
    /// to notice, then [`shutdown`](Server::shutdown).
    pub async fn drain_and_shutdown(&mut self) -> ShutdownReport {
        let drain = self.config.server.drain_duration();
        self.readiness().set(false);
        tracing::info!(
            parent: &self.span,
            drain_ms = drain.as_millis() as u64,
            "Draining before shutdown"
        );
        tokio::time::sleep(drain).await;
        self.shutdown().await
    }
}

async fn stop_stage(
    name: &'static str,
    listener: Option<ListenerHandle>,
    timeout: Duration,
) -> StageOutcome {
    let Some(listener) = listener else {
        tracing::debug!(listener = name, "Listener not running, nothing to stop");
        return StageOutcome::NotRunning;
    };

    match listener.shutdown(timeout).await {
        Ok(()) => {
            tracing::info!(listener = name, "Listener gracefully stopped");
            StageOutcome::Stopped
        }
        Err(StopError::Timeout { abandoned, .. }) => {
            tracing::error!(
                listener = name,
                timeout_ms = timeout.as_millis() as u64,
                abandoned,
                "Graceful shutdown timed out, listener force-closed"
            );
            StageOutcome::TimedOut { abandoned }
        }
        Err(e) => {
            tracing::error!(listener = name, error = %e, "Graceful shutdown failed");
            StageOutcome::Failed(e)
        }
    }
}
