//! Liveness, readiness and drain endpoints.
//!
//! | Path | Effect | Response |
//! |---|---|---|
//! | `/livez` | none | 200 |
//! | `/readyz` | reads the flag | 200 ready, 503 drained |
//! | `/drain` | flag = false | 200 |
//! | `/undrain` | flag = true | 200 |
//!
//! A request already admitted is not rejected by a later drain; only the
//! readiness probe reflects the flag.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;

use crate::health::readiness::ReadinessFlag;
use crate::http::middleware::{handler_fn, BoxHandler};

/// Health endpoints bound to one readiness flag.
#[derive(Debug, Clone)]
pub struct HealthEndpoints {
    readiness: ReadinessFlag,
}

impl HealthEndpoints {
    pub fn new(readiness: ReadinessFlag) -> Self {
        Self { readiness }
    }

    /// Always succeeds while the process can serve requests at all.
    pub fn liveness(&self) -> Response {
        (StatusCode::OK, Json(json!({ "status": "alive" }))).into_response()
    }

    pub fn readiness(&self) -> Response {
        if self.readiness.get() {
            (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "draining" })),
            )
                .into_response()
        }
    }

    /// Take the process out of traffic. Idempotent.
    pub fn drain(&self) -> Response {
        if self.readiness.set(false) {
            tracing::info!("Server marked as not ready");
        }
        (StatusCode::OK, Json(json!({ "status": "drained" }))).into_response()
    }

    /// Put the process back into traffic. Idempotent.
    pub fn undrain(&self) -> Response {
        if !self.readiness.set(true) {
            tracing::info!("Server marked as ready");
        }
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    }

    /// Handlers keyed by route name, ready for route binding.
    pub fn handlers(&self) -> [(&'static str, &'static str, BoxHandler); 4] {
        [
            ("livez", "/livez", self.endpoint(Self::liveness)),
            ("readyz", "/readyz", self.endpoint(Self::readiness)),
            ("drain", "/drain", self.endpoint(Self::drain)),
            ("undrain", "/undrain", self.endpoint(Self::undrain)),
        ]
    }

    fn endpoint(&self, f: fn(&Self) -> Response) -> BoxHandler {
        let endpoints = self.clone();
        handler_fn(move |_request| std::future::ready(f(&endpoints)))
    }
}
