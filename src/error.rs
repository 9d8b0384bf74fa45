//! Errors surfaced to the owner of a [`Server`](crate::lifecycle::Server).
//!
//! Only construction can fail. Serving and shutdown problems are logged
//! where they happen and reported through
//! [`ShutdownReport`](crate::lifecycle::ShutdownReport), never returned.

use thiserror::Error;

use crate::config::ConfigError;
use crate::observability::metrics::MetricsError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics initialization failed: {0}")]
    Metrics(#[from] MetricsError),
}
