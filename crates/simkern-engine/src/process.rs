//! Reusable, resumable execution carriers.
//!
//! A [`Process`] is a cooperative coroutine layered on an OS thread. The
//! thread parks on an assignment channel while the carrier sits in the
//! [`ProcessPool`](crate::ProcessPool); once assigned a target and an
//! event manager, it waits for the manager to hand it control, runs the
//! target (suspending and resuming any number of times on the way), then
//! releases control and returns to the pool.
//!
//! # Locking
//!
//! Each carrier's slot is guarded by its own mutex. Code that needs both
//! always takes the manager lock first; the slot lock is only ever held
//! for a handful of field updates.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use simkern_core::ProcessId;

use crate::manager::Kernel;
use crate::pool::ProcessPool;
use crate::target::ProcessTarget;

thread_local! {
    static CURRENT: RefCell<Option<Process>> = const { RefCell::new(None) };
}

/// Execution state of a carrier.
///
/// At most one carrier per manager is [`Active`](Self::Active). A
/// termination request can only be attached to a parked waiter, so the
/// terminating variants exist only for the two wait states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Pooled, or bound to a target but not yet given control.
    Idle,
    /// Holding control of its event manager.
    Active,
    /// Handed control to another process it started or interrupted, and
    /// waiting for that process to suspend or finish.
    Yielded,
    /// Parked until its wait event is dispatched.
    SchedWait,
    /// Parked in the conditional-wait list.
    CondWait,
    /// Parked in a scheduled wait with a pending termination.
    SchedWaitTerminating,
    /// Parked in a conditional wait with a pending termination.
    CondWaitTerminating,
}

impl ProcessState {
    /// True if the next resume will deliver the cancellation signal.
    pub fn is_terminating(self) -> bool {
        matches!(self, Self::SchedWaitTerminating | Self::CondWaitTerminating)
    }

    /// Attach a termination request. Fails unless parked in a wait.
    pub(crate) fn terminate(&mut self) -> bool {
        *self = match *self {
            Self::SchedWait | Self::SchedWaitTerminating => Self::SchedWaitTerminating,
            Self::CondWait | Self::CondWaitTerminating => Self::CondWaitTerminating,
            _ => return false,
        };
        true
    }
}

/// Mutable carrier state, guarded by the carrier's own lock.
pub(crate) struct ProcessSlot {
    /// Work to run; detached when execution starts.
    pub(crate) target: Option<Arc<dyn ProcessTarget>>,
    /// Manager this carrier is bound to, `None` while pooled.
    pub(crate) kernel: Option<Arc<Kernel>>,
    /// Carrier to hand control to when this one suspends or finishes.
    /// `None` hands control back to the driver.
    pub(crate) next: Option<Process>,
    pub(crate) state: ProcessState,
    /// Sticky resume signal: set by whoever hands over control (or
    /// delivers a termination), consumed by the carrier when it wakes.
    pub(crate) resume: bool,
}

impl ProcessSlot {
    fn new() -> Self {
        Self {
            target: None,
            kernel: None,
            next: None,
            state: ProcessState::Idle,
            resume: false,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

struct ProcessInner {
    id: ProcessId,
    name: String,
    slot: Mutex<ProcessSlot>,
    assign: Sender<Arc<Kernel>>,
}

/// Handle to a process carrier. Cloning yields another handle to the
/// same carrier; equality is identity.
#[derive(Clone)]
pub struct Process {
    inner: Arc<ProcessInner>,
}

impl Process {
    /// The process running on the calling thread, if any.
    pub fn current() -> Option<Process> {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Carrier id, stable across reuse.
    pub fn id(&self) -> ProcessId {
        self.inner.id
    }

    /// Carrier name (also its thread name).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current execution state.
    pub fn state(&self) -> ProcessState {
        self.slot().state
    }

    pub(crate) fn slot(&self) -> MutexGuard<'_, ProcessSlot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this carrier is running or has been handed control and has
    /// not yet observed it.
    pub(crate) fn holds_control(&self) -> bool {
        let slot = self.slot();
        slot.state == ProcessState::Active || slot.resume
    }

    /// Whether this carrier is bound to `kernel`.
    pub(crate) fn is_bound_to(&self, kernel: &Arc<Kernel>) -> bool {
        self.slot()
            .kernel
            .as_ref()
            .is_some_and(|k| Arc::ptr_eq(k, kernel))
    }

    /// Take a carrier from `pool` (spawning one if it is empty) and bind
    /// it to `kernel` and `target`. The carrier stays parked until the
    /// kernel resumes it.
    pub(crate) fn allocate(
        pool: &'static ProcessPool,
        kernel: &Arc<Kernel>,
        target: Arc<dyn ProcessTarget>,
    ) -> io::Result<Process> {
        loop {
            let process = pool.acquire()?;
            {
                let mut slot = process.slot();
                slot.reset();
                slot.target = Some(Arc::clone(&target));
                slot.kernel = Some(Arc::clone(kernel));
            }
            if process.inner.assign.send(Arc::clone(kernel)).is_ok() {
                return Ok(process);
            }
            // The carrier's thread is gone; forget it and take another.
            tracing::debug!(process = %process.name(), "discarding dead carrier");
        }
    }

    /// Spawn a new carrier thread, parked until its first assignment.
    pub(crate) fn spawn(pool: &'static ProcessPool, seq: u64) -> io::Result<Process> {
        let (assign, assignments) = crossbeam_channel::bounded(1);
        let process = Process {
            inner: Arc::new(ProcessInner {
                id: ProcessId::next(),
                name: format!("simkern-proc-{seq}"),
                slot: Mutex::new(ProcessSlot::new()),
                assign,
            }),
        };
        let carrier = process.clone();
        thread::Builder::new()
            .name(process.name().to_owned())
            .spawn(move || carrier_loop(carrier, assignments, pool))?;
        tracing::debug!(process = %process.name(), "spawned process carrier");
        Ok(process)
    }
}

/// Body of every carrier thread: park awaiting assignment, run it,
/// return to the pool, repeat. Exits once the pool declines to keep it.
fn carrier_loop(process: Process, assignments: Receiver<Arc<Kernel>>, pool: &'static ProcessPool) {
    CURRENT.with(|c| *c.borrow_mut() = Some(process.clone()));
    while let Ok(kernel) = assignments.recv() {
        kernel.run_process(&process);
        drop(kernel);
        process.slot().reset();
        if !pool.release(&process) {
            break;
        }
    }
    CURRENT.with(|c| *c.borrow_mut() = None);
    tracing::debug!(process = %process.name(), "process carrier exiting");
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Process {}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
