//! Access logging.
//!
//! One structured log event per request: method, path, route, status,
//! duration and the `x-request-id` assigned at the router edge. Server
//! errors are logged at WARN, everything else at INFO. A panicking handler
//! is logged at ERROR and the panic resumed, so the router turns it into a 500.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::Request, response::Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::http::middleware::BoxHandler;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Wrap `handler` with access logging for `route`.
pub fn access_log(route: &'static str, handler: BoxHandler) -> BoxHandler {
    Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_owned();
        let handler = Arc::clone(&handler);

        Box::pin(async move {
            let response = match AssertUnwindSafe(handler(request)).catch_unwind().await {
                Ok(response) => response,
                Err(panic) => {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        route,
                        duration_us = start.elapsed().as_micros() as u64,
                        panic = panic_message(panic.as_ref()),
                        "Request handler panicked"
                    );
                    std::panic::resume_unwind(panic);
                }
            };
            let status = response.status();
            let duration_us = start.elapsed().as_micros() as u64;

            if status.is_server_error() {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route,
                    status = status.as_u16(),
                    duration_us,
                    "Request failed"
                );
            } else {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route,
                    status = status.as_u16(),
                    duration_us,
                    "Request handled"
                );
            }

            response
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
