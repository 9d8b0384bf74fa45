//! Key service server library.
//!
//! HTTP shell around a key-management backend: readiness and drain
//! endpoints, per-route latency histograms, and graceful startup and
//! shutdown of an API listener and a metrics listener.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::Config;
pub use error::ServerError;
pub use http::{KeyOperation, KeyService};
pub use lifecycle::Server;
