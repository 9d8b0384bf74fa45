//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the Prometheus recorder for this server instance
//! - Get-or-create named latency histograms
//! - Keep an in-process snapshot of each histogram for diagnostics
//! - Serve the Prometheus scrape endpoint on the metrics listener
//! - Periodic exporter upkeep, which folds pending histogram samples into
//!   their buckets whether or not anything scrapes
//!
//! # Metrics
//! - `request_duration_<route>` (histogram, microseconds): API request latency
//!
//! # Design Decisions
//! - The recorder is owned, not installed globally, so independent servers
//!   can coexist in one process
//! - Histogram lookup goes through a sharded map; recording is atomic and
//!   never takes a lock

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use dashmap::DashMap;
use metrics::{Histogram, Key, KeyName, Level, Metadata, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::MetricsConfig;

/// Prefix shared by every request latency histogram.
pub const REQUEST_DURATION_PREFIX: &str = "request_duration_";

const REQUEST_DURATION_HELP: &str = "API request handling duration";

/// Same cadence the exporter uses when it runs its own upkeep.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Failure to initialize the metrics subsystem.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid histogram buckets: {0}")]
    Buckets(#[from] BuildError),

    #[error("histogram buckets must be finite and strictly increasing")]
    UnorderedBuckets,
}

/// Registry of named latency histograms backed by a Prometheus recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    histograms: DashMap<String, Arc<LatencyHistogram>>,
}

impl MetricsRegistry {
    /// Build a registry for the given service.
    ///
    /// Fails if the bucket layout is empty, unordered or not finite.
    pub fn new(service_name: &str, config: &MetricsConfig) -> Result<Self, MetricsError> {
        let buckets = &config.latency_buckets_us;
        if buckets.iter().any(|b| !b.is_finite()) || buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MetricsError::UnorderedBuckets);
        }

        let recorder = PrometheusBuilder::new()
            .add_global_label("service", service_name)
            .set_buckets_for_metric(
                Matcher::Prefix(REQUEST_DURATION_PREFIX.to_string()),
                buckets,
            )?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            inner: Arc::new(RegistryInner {
                recorder,
                handle,
                histograms: DashMap::new(),
            }),
        })
    }

    /// Fetch the histogram called `name`, creating it on first use.
    pub fn histogram(&self, name: &str) -> Arc<LatencyHistogram> {
        if let Some(existing) = self.inner.histograms.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .inner
            .histograms
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(histogram = %name, "Registering latency histogram");
                Arc::new(self.register(name))
            });
        Arc::clone(entry.value())
    }

    fn register(&self, name: &str) -> LatencyHistogram {
        let recorder = &self.inner.recorder;
        recorder.describe_histogram(
            KeyName::from(name.to_string()),
            Some(Unit::Microseconds),
            SharedString::const_str(REQUEST_DURATION_HELP),
        );

        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        let histogram = recorder.register_histogram(&Key::from_name(name.to_string()), &metadata);
        LatencyHistogram::new(histogram)
    }

    /// Snapshot of every registered histogram, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, HistogramSnapshot)> {
        let mut all: Vec<_> = self
            .inner
            .histograms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    /// Fold pending histogram samples into their buckets.
    ///
    /// Samples otherwise accumulate until the next render, so this must run
    /// periodically when nothing scrapes `/metrics`.
    pub fn run_upkeep(&self) {
        self.inner.handle.run_upkeep();
    }

    /// Run [`run_upkeep`](Self::run_upkeep) every `interval` until the
    /// returned task is aborted.
    pub fn spawn_upkeep(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.run_upkeep();
            }
        })
    }

    /// Router served on the metrics listener.
    pub fn router(&self) -> Router {
        let registry = self.clone();
        Router::new().route(
            "/metrics",
            get(move || std::future::ready(registry.render())),
        )
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("histograms", &self.inner.histograms.len())
            .finish()
    }
}

/// A latency histogram measured in whole microseconds.
///
/// Every sample goes to the exporter histogram; count, sum, min and max are
/// also kept in atomics for in-process inspection.
pub struct LatencyHistogram {
    exported: Histogram,
    count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl LatencyHistogram {
    fn new(exported: Histogram) -> Self {
        Self {
            exported,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }

    /// Record one sample.
    pub fn record(&self, micros: u64) {
        self.exported.record(micros as f64);
        self.sum.fetch_add(micros, Ordering::Relaxed);
        self.min.fetch_min(micros, Ordering::Relaxed);
        self.max.fetch_max(micros, Ordering::Relaxed);
        // Count last so a reader seeing `count` samples also sees their sum.
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Number of samples recorded so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let count = self.count();
        HistogramSnapshot {
            count,
            sum_us: self.sum.load(Ordering::Relaxed),
            min_us: if count == 0 { 0 } else { self.min.load(Ordering::Relaxed) },
            max_us: self.max.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Point-in-time summary of a [`LatencyHistogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum_us: u64,
    pub min_us: u64,
    pub max_us: u64,
}
