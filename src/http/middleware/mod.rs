//! Per-route middleware as explicit function composition.
//!
//! # Data Flow
//! ```text
//! request
//!     → access_log.rs (request id, status, duration, one log line)
//!     → instrument.rs (latency sample into request_duration_<route>)
//!     → bare handler
//! ```
//!
//! # Design Decisions
//! - Composition order is fixed by `bind_route`, not by router layer order
//! - Every wrapper has the same shape as the handler it wraps

pub mod access_log;
pub mod instrument;

use std::future::Future;
use std::sync::Arc;

use axum::{extract::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::observability::metrics::MetricsRegistry;

pub use access_log::access_log;
pub use instrument::{instrument, LatencyTimer};

/// A type-erased request handler.
pub type BoxHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Erase an async function into a [`BoxHandler`].
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
        Box::pin(f(request))
    })
}

/// Bind a business handler: access logging outside, latency instrumentation inside.
pub fn bind_route(route: &'static str, metrics: &MetricsRegistry, handler: BoxHandler) -> BoxHandler {
    access_log(route, instrument(route, metrics, handler))
}
