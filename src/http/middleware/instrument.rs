//! Request latency instrumentation.
//!
//! Wraps a handler so each invocation records exactly one sample, in
//! microseconds, into the histogram `request_duration_<route>`.
//!
//! The sample is written by a drop guard, so it is emitted on every exit
//! path: normal return, a panic unwinding through the handler future, or
//! the future being dropped when a listener is force-closed.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::http::middleware::BoxHandler;
use crate::observability::metrics::{LatencyHistogram, MetricsRegistry, REQUEST_DURATION_PREFIX};

/// Wrap `handler` with latency recording for `route`.
pub fn instrument(route: &str, metrics: &MetricsRegistry, handler: BoxHandler) -> BoxHandler {
    let histogram_name = format!("{REQUEST_DURATION_PREFIX}{route}");
    let metrics = metrics.clone();

    Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
        let timer = LatencyTimer::start(metrics.histogram(&histogram_name));
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let _timer = timer;
            handler(request).await
        })
    })
}

/// Records the time elapsed since [`LatencyTimer::start`] when dropped.
#[derive(Debug)]
pub struct LatencyTimer {
    start: Instant,
    histogram: Arc<LatencyHistogram>,
}

impl LatencyTimer {
    pub fn start(histogram: Arc<LatencyHistogram>) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.histogram.record(micros);
    }
}
