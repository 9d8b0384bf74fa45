//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, per-connection task)
//!     → connection.rs (ID, open-connection count)
//!     → Hand off to the HTTP router
//!
//! Listener States:
//!     Serving → Draining → Stopped
//!                       ↘ Force-closed (deadline expired)
//! ```
//!
//! # Design Decisions
//! - Accept loop runs as a tracked task, never detached
//! - Each connection tracked so a forced close can report what it dropped

pub mod connection;
pub mod listener;

pub use listener::{ListenerError, ListenerHandle, ServeOptions, StopError};
