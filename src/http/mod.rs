//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Connection (net::listener)
//!     → router.rs (routes, router-wide layers)
//!     → middleware/ (access log → latency instrumentation)
//!     → keyservice.rs (business operations) or health endpoints
//!     → debug.rs (diagnostics, when enabled)
//! ```

pub mod debug;
pub mod keyservice;
pub mod middleware;
pub mod router;

pub use keyservice::{KeyOperation, KeyService, UnavailableKeyService};
pub use middleware::{bind_route, handler_fn, BoxHandler};
pub use router::{build_router, RouterContext};
