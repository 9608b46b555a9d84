//! Run identifiers for log correlation.
//!
//! Every run gets an id that is recorded on its tracing span, so the log
//! lines of concurrent runs in one process can be told apart.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Counter for short run IDs.
static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of a single run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Create a new random (UUID v4) run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a short run ID based on a process-wide counter.
    ///
    /// Cheaper than a UUID but only unique within a single process.
    /// Format: `run-{counter}` with the counter zero-padded to 16 hex digits.
    pub fn short() -> Self {
        let count = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("run-{:016x}", count))
    }

    /// Get the run ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
