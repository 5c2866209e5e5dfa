//! Observation hooks for code outside the kernel.
//!
//! Visualisation and tooling observe kernel activity only through these
//! traits. Every callback runs on whichever thread triggered it while
//! the manager lock is held, so implementations must be quick and must
//! not call back into the [`EventManager`](crate::EventManager).

use simkern_core::{ProcessError, Tick};

use crate::event::Event;

/// Clock observer.
pub trait TimeListener: Send + Sync {
    /// The simulation clock moved to `tick`.
    fn tick_update(&self, _tick: Tick) {}

    /// The driver started (`true`) or stopped (`false`) dispatching.
    fn time_running(&self, _running: bool) {}
}

/// Receives failures that escape a dispatched target.
///
/// The manager is already paused when this is called; queue and clock
/// are left as they were when the failure happened.
pub trait ErrorListener: Send + Sync {
    /// `error` escaped a target on `manager` at `tick`.
    fn handle_error(&self, manager: &str, error: &ProcessError, tick: Tick);
}

/// Per-operation trace of scheduling activity.
///
/// `now` is the manager's current tick at the time of the call.
#[allow(unused_variables)]
pub trait TraceListener: Send + Sync {
    /// An event was removed from the head of the list and dispatched.
    fn trace_event(&self, manager: &str, now: Tick, event: &Event) {}

    /// A target was scheduled (also called for suppressed duplicates).
    fn trace_sched_process(&self, manager: &str, now: Tick, event: &Event) {}

    /// The active process suspended until `event` fires.
    fn trace_wait(&self, manager: &str, now: Tick, event: &Event) {}

    /// The active process registered as a conditional waiter.
    fn trace_wait_until(&self, manager: &str, now: Tick) {}

    /// A conditional waiter was satisfied and requeued as `event`.
    fn trace_wait_until_ended(&self, manager: &str, now: Tick, event: &Event) {}

    /// `event` was pulled forward and run immediately.
    fn trace_interrupt(&self, manager: &str, now: Tick, event: &Event) {}

    /// `event` was cancelled.
    fn trace_kill(&self, manager: &str, now: Tick, event: &Event) {}

    /// A new process was started for a target and given control.
    fn trace_process_start(&self, manager: &str, now: Tick, description: &str) {}

    /// A process finished its target and released control.
    fn trace_process_end(&self, manager: &str, now: Tick) {}
}

/// Time listener that ignores everything.
pub(crate) struct NoopTimeListener;

impl TimeListener for NoopTimeListener {}

/// Default error listener: logs the failure through `tracing`.
#[derive(Debug, Default)]
pub struct LogErrorListener;

impl ErrorListener for LogErrorListener {
    fn handle_error(&self, manager: &str, error: &ProcessError, tick: Tick) {
        tracing::error!(manager, tick, %error, "process target failed; event manager paused");
    }
}
