//! Diagnostic endpoints, mounted under `/debug` only when enabled.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::config::Config;
use crate::health::ReadinessFlag;
use crate::observability::metrics::{HistogramSnapshot, MetricsRegistry};

#[derive(Clone)]
pub struct DebugState {
    pub readiness: ReadinessFlag,
    pub metrics: MetricsRegistry,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

#[derive(Serialize)]
pub struct RuntimeVars {
    pub version: &'static str,
    pub ready: bool,
    pub uptime_secs: u64,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

pub fn router(state: DebugState) -> Router {
    Router::new()
        .route("/vars", get(get_vars))
        .route("/config", get(get_config))
        .with_state(state)
}

pub async fn get_vars(State(state): State<DebugState>) -> Json<RuntimeVars> {
    Json(RuntimeVars {
        version: env!("CARGO_PKG_VERSION"),
        ready: state.readiness.get(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        histograms: state.metrics.snapshot().into_iter().collect(),
    })
}

pub async fn get_config(State(state): State<DebugState>) -> Json<Config> {
    Json(state.config.as_ref().clone())
}
