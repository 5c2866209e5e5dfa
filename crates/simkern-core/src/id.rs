//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ProcessId`] allocation.
static PROCESS_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies a process carrier for its whole lifetime.
///
/// Carriers are pooled and reused across targets, so an id names the
/// carrier, not the unit of work it happens to be running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// Allocate a fresh id, never returned before within this process.
    pub fn next() -> Self {
        Self(PROCESS_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
