//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator probes:
//!     GET /livez  → handlers.rs → always 200
//!     GET /readyz → handlers.rs → readiness.rs (200 / 503)
//!
//! Operator / deploy tooling:
//!     GET /drain   → readiness.rs = false
//!     GET /undrain → readiness.rs = true
//! ```
//!
//! # Design Decisions
//! - Liveness never consults readiness
//! - The readiness flag is owned by the server and handed to the handlers,
//!   never stored in a global

pub mod handlers;
pub mod readiness;

pub use handlers::HealthEndpoints;
pub use readiness::ReadinessFlag;
