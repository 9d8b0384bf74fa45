//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (server.rs):
//!     Validate config → Init metrics → Build routers → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Stop API listener (bounded) → Stop metrics listener (bounded)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Drain → wait drain_duration → Shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: metrics listener first, API listener last
//! - Ordered shutdown: API first so metrics outlive API traffic
//! - Shutdown has a deadline per listener: forced close after it
//! - Draining is an explicit step before shutdown, never implied by it

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::Server;
pub use shutdown::{ShutdownReport, StageOutcome};
pub use signals::{run_until_signal, wait_for_signal};
