//! Identifier types.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for context IDs.
static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one constructed audio output context.
///
/// Gain nodes record the context they are connected to by ID, so a node wired
/// to a torn-down context can be detected without holding the context alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh context ID.
    #[must_use]
    pub fn next() -> Self {
        Self(CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a context ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}
