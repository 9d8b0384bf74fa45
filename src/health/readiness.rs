//! Process readiness flag.
//!
//! A single bit telling orchestrators and load balancers whether this
//! process should receive new traffic. It is deliberately not a richer
//! state machine: the only consumer is a binary health probe.
//!
//! # States
//! ```text
//! READY ──drain──▶ DRAINED
//! DRAINED ──undrain──▶ READY
//! ```
//! There is no automatic transition out of DRAINED.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared readiness bit. Clones observe and mutate the same value.
#[derive(Debug, Clone)]
pub struct ReadinessFlag {
    ready: Arc<AtomicBool>,
}

impl ReadinessFlag {
    /// Create a flag in the READY state.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Overwrite the flag. Returns the previous value.
    pub fn set(&self, ready: bool) -> bool {
        self.ready.swap(ready, Ordering::SeqCst)
    }

    /// Most recently written value.
    pub fn get(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl Default for ReadinessFlag {
    fn default() -> Self {
        Self::new()
    }
}
