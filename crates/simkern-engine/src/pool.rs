//! Process-wide free list of idle carriers.
//!
//! Allocation never fails for lack of carriers: an empty pool spawns a
//! new one. Growth is bounded only on the way back in: a carrier that
//! finishes while the pool already holds [`ProcessPool::max_idle`] idle
//! carriers lets its thread exit instead of parking.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::process::Process;

/// Idle carriers kept by the shared pool.
pub const MAX_IDLE_CARRIERS: usize = 100;

static SHARED: OnceLock<ProcessPool> = OnceLock::new();

/// Free list of parked carriers.
pub struct ProcessPool {
    idle: Mutex<Vec<Process>>,
    created: AtomicU64,
    max_idle: usize,
}

impl ProcessPool {
    /// An empty pool that keeps at most `max_idle` parked carriers.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            created: AtomicU64::new(0),
            max_idle,
        }
    }

    /// The pool shared by every event manager in this process.
    pub fn shared() -> &'static ProcessPool {
        SHARED.get_or_init(|| ProcessPool::new(MAX_IDLE_CARRIERS))
    }

    /// Upper bound on parked carriers.
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    /// Carriers currently parked awaiting assignment.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Carriers spawned by this pool since creation.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Pop a parked carrier, or spawn a new one.
    pub(crate) fn acquire(&'static self) -> io::Result<Process> {
        if let Some(p) = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop() {
            return Ok(p);
        }
        let seq = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        Process::spawn(self, seq)
    }

    /// Offer a finished carrier back. Returns `false` if the pool is full
    /// and the carrier should exit.
    pub(crate) fn release(&self, process: &Process) -> bool {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() >= self.max_idle {
            tracing::debug!(process = %process.name(), "pool full, retiring carrier");
            return false;
        }
        idle.push(process.clone());
        true
    }
}
