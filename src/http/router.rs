//! API router construction.
//!
//! # Routes
//! - `POST /api/{derive_pubkey,get_pubkey,encrypt,decrypt}` → key service,
//!   access-logged and latency-instrumented
//! - `GET /livez`, `/readyz`, `/drain`, `/undrain` → health endpoints,
//!   access-logged
//! - `/debug/*` → diagnostics, only when enabled
//!
//! # Layers (outermost first)
//! panic → 500, request id assignment, request id propagation, write timeout
//!
//! A request still running after `write_timeout` is answered with 503: the
//! server gave up on producing the response, the client was not slow.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use futures_util::future::BoxFuture;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::config::Config;
use crate::health::{HealthEndpoints, ReadinessFlag};
use crate::http::debug::{self, DebugState};
use crate::http::keyservice::{KeyOperation, KeyService};
use crate::http::middleware::{access_log, bind_route, BoxHandler};
use crate::observability::metrics::MetricsRegistry;

/// Everything the API router needs from its owner.
#[derive(Clone)]
pub struct RouterContext {
    pub config: Arc<Config>,
    pub key_service: Arc<dyn KeyService>,
    pub readiness: ReadinessFlag,
    pub metrics: MetricsRegistry,
    pub started_at: Instant,
}

/// Build the API router with all routes and middleware layers.
pub fn build_router(ctx: RouterContext) -> Router {
    let mut router = Router::new();

    for operation in KeyOperation::ALL {
        let key_service = Arc::clone(&ctx.key_service);
        let handler: BoxHandler = Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
            let key_service = Arc::clone(&key_service);
            Box::pin(async move { key_service.handle(operation, request).await })
        });
        let bound = bind_route(operation.route_name(), &ctx.metrics, handler);
        router = router.route(operation.path(), post(mount(bound)));
    }

    let health = HealthEndpoints::new(ctx.readiness.clone());
    for (name, path, handler) in health.handlers() {
        router = router.route(path, get(mount(access_log(name, handler))));
    }

    if ctx.config.server.enable_debug {
        tracing::info!("Debug endpoints enabled");
        router = router.nest(
            "/debug",
            debug::router(DebugState {
                readiness: ctx.readiness.clone(),
                metrics: ctx.metrics.clone(),
                config: Arc::clone(&ctx.config),
                started_at: ctx.started_at,
            }),
        );
    }

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            ctx.config.server.write_timeout(),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::new())
}

/// Adapt a [`BoxHandler`] into an axum handler.
fn mount(
    handler: BoxHandler,
) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    move |request: Request| handler(request)
}
