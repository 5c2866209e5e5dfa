//! The event manager: clock, future-event list, conditional waits, run
//! gate and real-time pacing.
//!
//! [`EventManager`] is a cheap, cloneable handle to a shared kernel.
//! The kernel's state lives behind one mutex; every scheduling decision
//! and every hand-off of control between the driver thread and process
//! carriers happens while holding it.
//!
//! # Hand-off protocol
//!
//! Control moves by setting the receiver's sticky resume flag (a
//! carrier's `resume`, or the driver's `driver_wake`), notifying the
//! shared condition variable, and then parking on the same condition
//! variable until the caller's own flag is set. Because the flags are
//! sticky, a resume that lands before the receiver has parked is not
//! lost.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use simkern_core::tick::event_tick;
use simkern_core::{ConfigError, KernelError, ProcessError, Tick, TimeScale, MAX_TICK};

use crate::config::EventManagerConfig;
use crate::event::{Event, EventSummary, EventTarget};
use crate::listener::{ErrorListener, LogErrorListener, NoopTimeListener, TimeListener, TraceListener};
use crate::pool::ProcessPool;
use crate::process::{Process, ProcessState};
use crate::queue::EventList;
use crate::target::ProcessTarget;
use crate::wait::WaitTarget;

// ── RealTime ─────────────────────────────────────────────────────

/// Wall-clock pacing state.
pub(crate) struct RealTime {
    pub(crate) enabled: bool,
    pub(crate) factor: f64,
    /// Re-anchor `(tick, instant)` on the next poll.
    pub(crate) rebase: bool,
    ref_tick: Tick,
    ref_instant: Instant,
}

impl RealTime {
    fn new(factor: Option<f64>) -> Self {
        Self {
            enabled: factor.is_some(),
            factor: factor.unwrap_or(1.0),
            rebase: true,
            ref_tick: 0,
            ref_instant: Instant::now(),
        }
    }

    /// The furthest tick the clock may have reached by `now`.
    pub(crate) fn paced_tick(&mut self, current: Tick, scale: &TimeScale, now: Instant) -> Tick {
        if self.rebase {
            self.ref_tick = current;
            self.ref_instant = now;
            self.rebase = false;
        }
        let elapsed = now.saturating_duration_since(self.ref_instant).as_secs_f64() * self.factor;
        self.ref_tick
            .saturating_add(scale.seconds_to_nearest_tick(elapsed))
    }
}

// ── KernelState ──────────────────────────────────────────────────

pub(crate) struct KernelState {
    pub(crate) current_tick: Tick,
    /// Tick the driver last decided to advance to.
    pub(crate) next_tick: Tick,
    /// Dispatch ceiling: events at or beyond this tick are not run.
    pub(crate) target_tick: Tick,
    pub(crate) events: EventList,
    pub(crate) conditional: Vec<Process>,
    /// The run gate.
    pub(crate) execute_events: bool,
    /// True from `resume()` until the driver parks with the gate closed.
    pub(crate) running: bool,
    /// Control has been handed back to the driver.
    pub(crate) driver_wake: bool,
    pub(crate) shutdown: bool,
    pub(crate) time_scale: TimeScale,
    pub(crate) real_time: RealTime,
    pub(crate) pacing_slice: Duration,
    pub(crate) time_listener: Arc<dyn TimeListener>,
    pub(crate) trace_listener: Option<Arc<dyn TraceListener>>,
    pub(crate) error_listener: Arc<dyn ErrorListener>,
}

// ── Kernel ───────────────────────────────────────────────────────

/// Shared core behind every [`EventManager`] handle.
pub(crate) struct Kernel {
    name: String,
    state: Mutex<KernelState>,
    cv: Condvar,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Kernel {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait<'a>(&self, st: MutexGuard<'a, KernelState>) -> MutexGuard<'a, KernelState> {
        self.cv.wait(st).unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait_timeout<'a>(
        &self,
        st: MutexGuard<'a, KernelState>,
        timeout: Duration,
    ) -> MutexGuard<'a, KernelState> {
        match self.cv.wait_timeout(st, timeout) {
            Ok((st, _)) => st,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    pub(crate) fn notify(&self) {
        self.cv.notify_all();
    }

    /// Give control to `next`, or to the driver when `None`.
    pub(crate) fn resume(&self, st: &mut KernelState, next: Option<&Process>) {
        match next {
            Some(p) => p.slot().resume = true,
            None => st.driver_wake = true,
        }
        self.notify();
    }

    /// Park the calling carrier until it is resumed.
    ///
    /// Returns [`ProcessError::Terminated`] if the resume carried a
    /// termination request; otherwise the carrier is now Active.
    pub(crate) fn park_process<'a>(
        self: &'a Arc<Self>,
        mut st: MutexGuard<'a, KernelState>,
        process: &Process,
    ) -> (MutexGuard<'a, KernelState>, Result<(), ProcessError>) {
        loop {
            {
                let mut slot = process.slot();
                if slot.resume {
                    slot.resume = false;
                    if slot.state.is_terminating() {
                        return (st, Err(ProcessError::Terminated));
                    }
                    slot.state = ProcessState::Active;
                    slot.kernel = Some(Arc::clone(self));
                    return (st, Ok(()));
                }
            }
            st = self.wait(st);
        }
    }

    /// Park the driver until control comes back to it (or shutdown).
    pub(crate) fn park_driver<'a>(
        &self,
        mut st: MutexGuard<'a, KernelState>,
    ) -> MutexGuard<'a, KernelState> {
        while !st.driver_wake && !st.shutdown {
            st = self.wait(st);
        }
        st.driver_wake = false;
        st
    }

    /// Hand control from the driver to `process` and wait for it back.
    pub(crate) fn switch_from_driver<'a>(
        &self,
        mut st: MutexGuard<'a, KernelState>,
        process: &Process,
    ) -> MutexGuard<'a, KernelState> {
        st.driver_wake = false;
        self.resume(&mut st, Some(process));
        self.park_driver(st)
    }

    /// Suspend the active `process` into `state`, passing control along
    /// its resume chain, and park until it is resumed.
    fn pop_process<'a>(
        self: &'a Arc<Self>,
        mut st: MutexGuard<'a, KernelState>,
        process: &Process,
        state: ProcessState,
    ) -> (MutexGuard<'a, KernelState>, Result<(), ProcessError>) {
        let next = {
            let mut slot = process.slot();
            slot.state = state;
            slot.next.take()
        };
        self.resume(&mut st, next.as_ref());
        self.park_process(st, process)
    }

    /// Run `child` now on behalf of the active `process`, which resumes
    /// once `child` suspends or finishes.
    fn push_process<'a>(
        self: &'a Arc<Self>,
        mut st: MutexGuard<'a, KernelState>,
        process: &Process,
        child: &Process,
    ) -> (MutexGuard<'a, KernelState>, Result<(), ProcessError>) {
        child.slot().next = Some(process.clone());
        process.slot().state = ProcessState::Yielded;
        self.resume(&mut st, Some(child));
        self.park_process(st, process)
    }

    /// The calling carrier, checked to hold control of this kernel.
    fn active_process(self: &Arc<Self>, operation: &'static str) -> Result<Process, ProcessError> {
        let Some(process) = Process::current() else {
            return Err(KernelError::NotAProcess {
                manager: self.name.clone(),
                operation,
            }
            .into());
        };
        let state = process.state();
        if state.is_terminating() {
            return Err(ProcessError::Terminated);
        }
        if state != ProcessState::Active || !process.is_bound_to(self) {
            return Err(KernelError::NotActive {
                manager: self.name.clone(),
                operation,
            }
            .into());
        }
        Ok(process)
    }

    /// Refuse new work from a carrier that was terminated and is unwinding.
    fn reject_cancelled(self: &Arc<Self>) -> Result<(), KernelError> {
        match Process::current() {
            Some(p) if p.is_bound_to(self) && p.state().is_terminating() => {
                Err(KernelError::ProcessTerminated {
                    manager: self.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

        fn event_tick(&self, st: &KernelState, delay: Tick) -> Result<Tick, KernelError> {
        event_tick(st.current_tick, delay).ok_or_else(|| KernelError::NegativeDuration {
            manager: self.name.clone(),
            ticks: delay,
        })
    }

    fn check_open(&self, st: &KernelState) -> Result<(), KernelError> {
        if st.shutdown {
            return Err(KernelError::ShutDown {
                manager: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Warn when a conditional waiter does scheduling work without first
    /// calling `wait_until_ended`.
    fn audit_cond_wait(&self, st: &KernelState, operation: &'static str) {
        let Some(current) = Process::current() else {
            return;
        };
        if st.conditional.contains(&current) {
            tracing::warn!(
                manager = %self.name,
                process = %current,
                operation,
                "wait_until without wait_until_ended"
            );
        }
    }

    /// Flag a parked carrier for termination and wake it so it unwinds.
    ///
    /// A waiter linked into the current conditional pass is unlinked first:
    /// whoever would have handed control to it hands it to its successor.
    fn terminate_parked(&self, st: &mut KernelState, process: &Process) {
        let flagged = process.slot().state.terminate();
        if !flagged {
            tracing::warn!(
                manager = %self.name,
                process = %process,
                state = ?process.state(),
                "terminating a carrier that is not parked in a wait"
            );
            return;
        }
        let successor = process.slot().next.take();
        for waiter in &st.conditional {
            if waiter == process {
                continue;
            }
            let mut slot = waiter.slot();
            if slot.next.as_ref() == Some(process) {
                slot.next = successor.clone();
            }
        }
        self.resume(st, Some(process));
    }

    fn spawn_error(&self, err: std::io::Error) -> KernelError {
        KernelError::CarrierSpawnFailed {
            manager: self.name.clone(),
            reason: err.to_string(),
        }
    }

    /// Bind a pooled carrier to `target`.
    pub(crate) fn allocate(
        self: &Arc<Self>,
        target: Arc<dyn ProcessTarget>,
    ) -> Result<Process, KernelError> {
        Process::allocate(ProcessPool::shared(), self, target).map_err(|e| self.spawn_error(e))
    }

    /// Pause and report a failure that escaped a target.
    pub(crate) fn report_failure(&self, st: &mut KernelState, error: &ProcessError) {
        st.execute_events = false;
        tracing::warn!(manager = %self.name, tick = st.current_tick, %error, "pausing after process failure");
        st.error_listener.handle_error(&self.name, error, st.current_tick);
    }

    // ── carrier side ─────────────────────────────────────────────

    /// Run the target bound to `process`: wait to be resumed, execute,
    /// then release control. Called on the carrier's own thread.
    pub(crate) fn run_process(self: &Arc<Self>, process: &Process) {
        let resumed = {
            let st = self.lock();
            let (_st, resumed) = self.park_process(st, process);
            resumed
        };
        if resumed.is_err() {
            return;
        }

        let target = process.slot().target.take();
        let outcome = match target {
            Some(target) => {
                let evt = EventManager {
                    kernel: Arc::clone(self),
                };
                panic::catch_unwind(AssertUnwindSafe(|| target.process(&evt)))
            }
            None => Ok(Ok(())),
        };

        if process.state().is_terminating() {
            // Cancelled while parked: control already belongs to someone
            // else, just unwind.
            return;
        }

        let failure = match outcome {
            Ok(Ok(())) | Ok(Err(ProcessError::Terminated)) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(ProcessError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        };
        self.release_process(process, failure);
    }

    /// Hand control along the chain of a process that finished.
    fn release_process(&self, process: &Process, failure: Option<ProcessError>) {
        let mut st = self.lock();
        self.audit_cond_wait(&st, "release");
        st.conditional.retain(|p| p != process);
        if let Some(error) = failure {
            self.report_failure(&mut st, &error);
        }
        if let Some(trace) = &st.trace_listener {
            trace.trace_process_end(&self.name, st.current_tick);
        }
        let next = {
            let mut slot = process.slot();
            slot.state = ProcessState::Idle;
            slot.kernel = None;
            slot.next.take()
        };
        self.resume(&mut st, next.as_ref());
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── EventManager ─────────────────────────────────────────────────

/// Handle to a discrete-event kernel instance.
///
/// Cloning is cheap and every clone addresses the same clock and event
/// list. Scheduling and control calls may come from any thread;
/// suspension calls ([`wait_ticks`](Self::wait_ticks),
/// [`wait_until`](Self::wait_until), [`interrupt`](Self::interrupt), ...)
/// must come from the process currently holding control.
#[derive(Clone)]
pub struct EventManager {
    kernel: Arc<Kernel>,
}

impl EventManager {
    /// Create an event manager and start its driver thread.
    ///
    /// The driver starts paused; call [`resume`](Self::resume) to run.
    pub fn new(config: EventManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = KernelState {
            current_tick: 0,
            next_tick: 0,
            target_tick: MAX_TICK,
            events: EventList::with_capacity(config.initial_capacity),
            conditional: Vec::new(),
            execute_events: false,
            running: false,
            driver_wake: false,
            shutdown: false,
            time_scale: config.time_scale()?,
            real_time: RealTime::new(config.real_time_factor),
            pacing_slice: config.pacing_slice,
            time_listener: Arc::new(NoopTimeListener),
            trace_listener: None,
            error_listener: Arc::new(LogErrorListener),
        };
        let kernel = Arc::new(Kernel {
            name: config.name,
            state: Mutex::new(state),
            cv: Condvar::new(),
            driver: Mutex::new(None),
        });

        let driver_kernel = Arc::clone(&kernel);
        let handle = thread::Builder::new()
            .name(format!("evt-{}", kernel.name))
            .spawn(move || crate::driver::run(driver_kernel))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("event manager driver: {e}"),
            })?;
        *kernel.driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::debug!(manager = %kernel.name, "event manager started");
        Ok(Self { kernel })
    }

    /// Create an event manager with default configuration.
    pub fn with_name(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(EventManagerConfig::named(name))
    }

    /// Manager name.
    pub fn name(&self) -> &str {
        self.kernel.name()
    }

    /// Current simulation tick.
    pub fn current_tick(&self) -> Tick {
        self.kernel.lock().current_tick
    }

    /// Whether the driver is dispatching (gate open, or not yet parked).
    pub fn is_running(&self) -> bool {
        self.kernel.lock().running
    }

    /// Pending events in dispatch order.
    pub fn pending_events(&self) -> Vec<EventSummary> {
        self.kernel.lock().events.iter().map(Event::summary).collect()
    }

    /// Number of pending events.
    pub fn pending_count(&self) -> usize {
        self.kernel.lock().events.len()
    }

    /// Number of processes parked in the conditional-wait list.
    pub fn conditional_count(&self) -> usize {
        self.kernel.lock().conditional.len()
    }

    /// The process running on the calling thread, if any.
    pub fn current_process(&self) -> Option<Process> {
        Process::current()
    }

    // ── time scale ───────────────────────────────────────────────

    /// Ticks per simulated second.
    pub fn ticks_per_second(&self) -> f64 {
        self.kernel.lock().time_scale.ticks_per_second()
    }

    /// Change the tick resolution used by the conversion helpers and by
    /// real-time pacing.
    pub fn set_ticks_per_second(&self, ticks_per_second: f64) -> Result<(), KernelError> {
        let scale = TimeScale::new(ticks_per_second).ok_or_else(|| KernelError::InvalidTimeScale {
            manager: self.kernel.name.clone(),
            ticks_per_second,
        })?;
        let mut st = self.kernel.lock();
        st.time_scale = scale;
        st.real_time.rebase = true;
        Ok(())
    }

    /// Round `seconds` to the nearest tick.
    pub fn seconds_to_nearest_tick(&self, seconds: f64) -> Tick {
        self.kernel.lock().time_scale.seconds_to_nearest_tick(seconds)
    }

    /// Simulated seconds covered by `ticks`.
    pub fn ticks_to_seconds(&self, ticks: Tick) -> f64 {
        self.kernel.lock().time_scale.ticks_to_seconds(ticks)
    }

    // ── listeners ────────────────────────────────────────────────

    /// Install a clock listener (`None` restores the no-op default). The
    /// listener is told the current tick immediately.
    pub fn set_time_listener(&self, listener: Option<Arc<dyn TimeListener>>) {
        let mut st = self.kernel.lock();
        st.time_listener = listener.unwrap_or_else(|| Arc::new(NoopTimeListener));
        st.time_listener.tick_update(st.current_tick);
    }

    /// Install a failure handler (`None` restores the logging default).
    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        self.kernel.lock().error_listener = listener.unwrap_or_else(|| Arc::new(LogErrorListener));
    }

    /// Install or remove the trace listener.
    pub fn set_trace_listener(&self, listener: Option<Arc<dyn TraceListener>>) {
        self.kernel.lock().trace_listener = listener;
    }

    // ── scheduling ───────────────────────────────────────────────

    /// Schedule `target` to run `delay` ticks from now.
    ///
    /// Lower `priority` runs first among events at the same tick; `fifo`
    /// picks the tie-break among equal `(tick, priority)`.
    pub fn schedule_process(
        &self,
        delay: Tick,
        priority: i32,
        fifo: bool,
        target: Arc<dyn ProcessTarget>,
    ) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        k.check_open(&st)?;
        k.reject_cancelled()?;
        let tick = k.event_tick(&st, delay)?;
        let event = Event::new(st.current_tick, tick, priority, EventTarget::Target(target));
        if let Some(trace) = &st.trace_listener {
            trace.trace_sched_process(&k.name, st.current_tick, &event);
        }
        st.events.insert(event, fifo);
        Ok(())
    }

    /// Like [`schedule_process`](Self::schedule_process), but a no-op if
    /// an event with the same resolved tick, priority and target is
    /// already pending.
    pub fn schedule_single_process(
        &self,
        delay: Tick,
        priority: i32,
        fifo: bool,
        target: Arc<dyn ProcessTarget>,
    ) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        k.check_open(&st)?;
        k.reject_cancelled()?;
        k.audit_cond_wait(&st, "schedule_single_process");
        let tick = k.event_tick(&st, delay)?;
        if let Some(existing) = st.events.find(tick, priority, &target) {
            if let Some(trace) = &st.trace_listener {
                trace.trace_sched_process(&k.name, st.current_tick, existing);
            }
            return Ok(());
        }
        let event = Event::new(st.current_tick, tick, priority, EventTarget::Target(target));
        if let Some(trace) = &st.trace_listener {
            trace.trace_sched_process(&k.name, st.current_tick, &event);
        }
        st.events.insert(event, fifo);
        Ok(())
    }

    /// Suspend the calling process for `ticks` ticks.
    ///
    /// The process resumes when its wait event is dispatched, ordered by
    /// `priority` and `fifo` against other events at that tick.
    pub fn wait_ticks(&self, ticks: Tick, priority: i32, fifo: bool) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let mut st = k.lock();
        let process = k.active_process("wait")?;
        k.audit_cond_wait(&st, "wait_ticks");
        let tick = k.event_tick(&st, ticks)?;
        let event = Event::new(
            st.current_tick,
            tick,
            priority,
            EventTarget::Wait(WaitTarget::new(process.clone())),
        );
        if let Some(trace) = &st.trace_listener {
            trace.trace_wait(&k.name, st.current_tick, &event);
        }
        st.events.insert(event, fifo);
        let (_st, resumed) = k.pop_process(st, &process, ProcessState::SchedWait);
        resumed
    }

    /// Suspend the calling process for `seconds` of simulated time,
    /// rounded to the nearest tick.
    pub fn wait_seconds(&self, seconds: f64, priority: i32, fifo: bool) -> Result<(), ProcessError> {
        let ticks = self.seconds_to_nearest_tick(seconds);
        self.wait_ticks(ticks, priority, fifo)
    }

    /// Park the calling process until its condition may have changed.
    ///
    /// The driver offers every conditional waiter a chance to run before
    /// each potential clock advance. Callers loop: test the condition,
    /// call `wait_until` while it is false, and call
    /// [`wait_until_ended`](Self::wait_until_ended) once it holds.
    /// Registering twice is a no-op; the call always suspends.
    pub fn wait_until(&self) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let mut st = k.lock();
        let process = k.active_process("wait_until")?;
        if !st.conditional.contains(&process) {
            if let Some(trace) = &st.trace_listener {
                trace.trace_wait_until(&k.name, st.current_tick);
            }
            st.conditional.push(process.clone());
        }
        let (_st, resumed) = k.pop_process(st, &process, ProcessState::CondWait);
        resumed
    }

    /// Leave the conditional-wait list and continue at the current tick.
    ///
    /// Returns immediately if the caller never called
    /// [`wait_until`](Self::wait_until). Otherwise the caller is requeued
    /// at the current tick (priority 0, FIFO) and suspends until that
    /// event is dispatched.
    pub fn wait_until_ended(&self) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let mut st = k.lock();
        let process = k.active_process("wait_until_ended")?;
        let Some(pos) = st.conditional.iter().position(|p| *p == process) else {
            return Ok(());
        };
        st.conditional.remove(pos);
        let event = Event::new(
            st.current_tick,
            st.current_tick,
            0,
            EventTarget::Wait(WaitTarget::new(process.clone())),
        );
        if let Some(trace) = &st.trace_listener {
            trace.trace_wait_until_ended(&k.name, st.current_tick, &event);
        }
        st.events.insert(event, true);
        let (_st, resumed) = k.pop_process(st, &process, ProcessState::SchedWait);
        resumed
    }

    /// Run `target` immediately on a new process. The caller resumes once
    /// the new process suspends or finishes.
    pub fn start_process(&self, target: Arc<dyn ProcessTarget>) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let st = k.lock();
        let process = k.active_process("start")?;
        k.audit_cond_wait(&st, "start_process");
        let description = target.description();
        let child = k.allocate(target)?;
        if let Some(trace) = &st.trace_listener {
            trace.trace_process_start(&k.name, st.current_tick, &description);
        }
        let (_st, resumed) = k.push_process(st, &process, &child);
        resumed
    }

    // ── interrupt / terminate ────────────────────────────────────

    /// Pull the pending wait of `target` forward and run it now.
    ///
    /// The caller resumes once `target` suspends again or finishes.
    pub fn interrupt_process(&self, target: &Process) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let mut st = k.lock();
        if target.holds_control() {
            return Err(KernelError::ActiveProcess {
                manager: k.name.clone(),
                operation: "interrupt",
            }
            .into());
        }
        let process = k.active_process("interrupt")?;
        k.audit_cond_wait(&st, "interrupt");
        let Some(event) = st.events.remove_process(target) else {
            return Err(KernelError::ProcessNotFound {
                manager: k.name.clone(),
            }
            .into());
        };
        if let Some(trace) = &st.trace_listener {
            trace.trace_interrupt(&k.name, st.current_tick, &event);
        }
        drop(event);
        let (_st, resumed) = k.push_process(st, &process, target);
        resumed
    }

    /// Pull the pending event for `target` forward and run it now on a new
    /// process.
    pub fn interrupt(&self, target: &Arc<dyn ProcessTarget>) -> Result<(), ProcessError> {
        let k = &self.kernel;
        let mut st = k.lock();
        let process = k.active_process("interrupt")?;
        k.audit_cond_wait(&st, "interrupt");
        let Some(event) = st.events.remove_target(target) else {
            return Err(KernelError::TargetNotFound {
                manager: k.name.clone(),
            }
            .into());
        };
        let child = match k.allocate(Arc::clone(target)) {
            Ok(child) => child,
            Err(e) => {
                st.events.insert(event, true);
                return Err(e.into());
            }
        };
        if let Some(trace) = &st.trace_listener {
            trace.trace_interrupt(&k.name, st.current_tick, &event);
        }
        let (_st, resumed) = k.push_process(st, &process, &child);
        resumed
    }

    /// Cancel a parked process.
    ///
    /// Its pending wait event or conditional registration is removed and
    /// the wait it is parked in returns [`ProcessError::Terminated`].
    pub fn terminate_process(&self, target: &Process) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        k.reject_cancelled()?;
        if target.holds_control() {
            return Err(KernelError::ActiveProcess {
                manager: k.name.clone(),
                operation: "terminate",
            });
        }
        k.audit_cond_wait(&st, "terminate");

        if let Some(pos) = st.conditional.iter().position(|p| p == target) {
            st.conditional.remove(pos);
            k.terminate_parked(&mut st, target);
            return Ok(());
        }

        let Some(event) = st.events.remove_process(target) else {
            return Err(KernelError::ProcessNotFound {
                manager: k.name.clone(),
            });
        };
        if let Some(trace) = &st.trace_listener {
            trace.trace_kill(&k.name, st.current_tick, &event);
        }
        k.terminate_parked(&mut st, target);
        Ok(())
    }

    /// Cancel the earliest pending event for `target`.
    pub fn terminate(&self, target: &Arc<dyn ProcessTarget>) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        k.reject_cancelled()?;
        k.audit_cond_wait(&st, "terminate");
        let Some(event) = st.events.remove_target(target) else {
            return Err(KernelError::TargetNotFound {
                manager: k.name.clone(),
            });
        };
        if let Some(trace) = &st.trace_listener {
            trace.trace_kill(&k.name, st.current_tick, &event);
        }
        Ok(())
    }

    // ── run control ──────────────────────────────────────────────

    /// Close the run gate. The event in flight finishes; nothing further
    /// is dispatched until [`resume`](Self::resume).
    pub fn pause(&self) {
        let mut st = self.kernel.lock();
        if st.execute_events {
            tracing::info!(manager = %self.kernel.name, tick = st.current_tick, "pausing");
        }
        st.execute_events = false;
    }

    /// Open the run gate and dispatch events up to (not including)
    /// `target_tick`. The gate closes by itself once the list is empty
    /// or its head reaches `target_tick`.
    pub fn resume(&self, target_tick: Tick) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        k.check_open(&st)?;
        st.target_tick = target_tick;
        st.real_time.rebase = true;
        if st.execute_events {
            return Ok(());
        }
        tracing::info!(manager = %k.name, tick = st.current_tick, target_tick, "resuming");
        st.execute_events = true;
        if !st.running {
            st.running = true;
            st.time_listener.time_running(true);
        }
        k.notify();
        Ok(())
    }

    /// Block the calling thread until the driver has stopped dispatching.
    ///
    /// Must not be called from a kernel process: the driver would wait
    /// on the caller forever.
    pub fn wait_for_pause(&self) -> Result<(), KernelError> {
        let k = &self.kernel;
        if Process::current().is_some_and(|p| p.is_bound_to(k)) {
            return Err(KernelError::CalledFromProcess {
                manager: k.name.clone(),
                operation: "wait_for_pause",
            });
        }
        let mut st = k.lock();
        while st.running && !st.shutdown {
            st = k.wait(st);
        }
        Ok(())
    }

    /// Resume up to `target_tick` and block until the driver stops.
    pub fn run_until(&self, target_tick: Tick) -> Result<(), KernelError> {
        self.resume(target_tick)?;
        self.wait_for_pause()
    }

    /// Enable or disable wall-clock pacing at `factor` simulated seconds
    /// per real second.
    pub fn set_execute_real_time(&self, enabled: bool, factor: f64) -> Result<(), KernelError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(KernelError::InvalidRealTimeFactor {
                manager: self.kernel.name.clone(),
                factor,
            });
        }
        let mut st = self.kernel.lock();
        st.real_time.enabled = enabled;
        st.real_time.factor = factor;
        if enabled {
            st.real_time.rebase = true;
        }
        self.kernel.notify();
        Ok(())
    }

    /// Whether wall-clock pacing is enabled.
    pub fn is_real_time(&self) -> bool {
        self.kernel.lock().real_time.enabled
    }

    /// Hard reset: clock back to 0, dispatch ceiling cleared, and every
    /// pending and conditional process terminated.
    pub fn clear(&self) -> Result<(), KernelError> {
        let k = &self.kernel;
        let mut st = k.lock();
        let any_active = st
            .events
            .iter()
            .filter_map(Event::process)
            .chain(st.conditional.iter())
            .any(Process::holds_control);
        if any_active {
            return Err(KernelError::ActiveProcess {
                manager: k.name.clone(),
                operation: "clear",
            });
        }

        st.current_tick = 0;
        st.next_tick = 0;
        st.target_tick = MAX_TICK;
        st.time_listener.tick_update(0);
        st.real_time.rebase = true;

        for event in st.events.drain() {
            if let EventTarget::Wait(wait) = event.into_target() {
                k.terminate_parked(&mut st, &wait.into_process());
            }
        }
        let waiters = std::mem::take(&mut st.conditional);
        for process in &waiters {
            k.terminate_parked(&mut st, process);
        }
        k.notify();
        tracing::info!(manager = %k.name, "event manager cleared");
        Ok(())
    }

    /// Clear all work and stop the driver thread. Later scheduling calls
    /// fail with [`KernelError::ShutDown`].
    pub fn shutdown(&self) -> Result<(), KernelError> {
        let k = &self.kernel;
        {
            let st = k.lock();
            if st.shutdown {
                return Ok(());
            }
        }
        self.clear()?;
        {
            let mut st = k.lock();
            st.shutdown = true;
            st.execute_events = false;
            st.running = false;
            k.notify();
        }
        let handle = k.driver.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!(manager = %k.name, "driver thread panicked");
            }
        }
        tracing::info!(manager = %k.name, "event manager shut down");
        Ok(())
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.kernel.lock();
        f.debug_struct("EventManager")
            .field("name", &self.kernel.name)
            .field("current_tick", &st.current_tick)
            .field("pending", &st.events.len())
            .field("conditional", &st.conditional.len())
            .field("running", &st.running)
            .finish()
    }
}

impl fmt::Display for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kernel.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::FnTarget;

    fn noop() -> Arc<dyn ProcessTarget> {
        FnTarget::shared("noop", |_| Ok(()))
    }

    #[test]
    fn paced_tick_tracks_wall_clock_times_factor() {
        let mut rt = RealTime::new(Some(2.0));
        let scale = TimeScale::new(1000.0).unwrap();
        let t0 = Instant::now();
        assert_eq!(rt.paced_tick(50, &scale, t0), 50);
        let t1 = t0 + Duration::from_millis(500);
        // 0.5 s wall * 2.0 = 1 s simulated = 1000 ticks.
        assert_eq!(rt.paced_tick(50, &scale, t1), 1050);
    }

    #[test]
    fn paced_tick_rebases() {
        let mut rt = RealTime::new(Some(1.0));
        let scale = TimeScale::new(1000.0).unwrap();
        let t0 = Instant::now();
        rt.paced_tick(0, &scale, t0);
        rt.rebase = true;
        let t1 = t0 + Duration::from_secs(3);
        assert_eq!(rt.paced_tick(10, &scale, t1), 10);
    }

    #[test]
    fn negative_delay_leaves_queue_unchanged() {
        let evt = EventManager::with_name("neg").unwrap();
        evt.schedule_process(3, 1, true, noop()).unwrap();
        let before = evt.pending_events();
        let err = evt.schedule_process(-1, 1, true, noop()).unwrap_err();
        assert!(matches!(err, KernelError::NegativeDuration { ticks: -1, .. }));
        assert!(err.to_string().contains("neg"));
        assert_eq!(evt.pending_events(), before);
        evt.shutdown().unwrap();
    }

    #[test]
    fn overflowing_delay_saturates() {
        let evt = EventManager::with_name("sat").unwrap();
        evt.schedule_process(MAX_TICK, 0, true, noop()).unwrap();
        assert_eq!(evt.pending_events()[0].tick, MAX_TICK);
        evt.shutdown().unwrap();
    }

    #[test]
    fn suspension_outside_process_rejected() {
        let evt = EventManager::with_name("outside").unwrap();
        let err = evt.wait_ticks(1, 0, true).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Kernel(KernelError::NotAProcess { .. })
        ));
        assert!(evt.wait_until().is_err());
        evt.shutdown().unwrap();
    }

    #[test]
    fn bad_real_time_factor_rejected() {
        let evt = EventManager::with_name("rt").unwrap();
        assert!(evt.set_execute_real_time(true, 0.0).is_err());
        assert!(!evt.is_real_time());
        evt.set_execute_real_time(true, 4.0).unwrap();
        assert!(evt.is_real_time());
        evt.shutdown().unwrap();
    }

    #[test]
    fn schedule_after_shutdown_rejected() {
        let evt = EventManager::with_name("closed").unwrap();
        evt.shutdown().unwrap();
        evt.shutdown().unwrap();
        assert!(matches!(
            evt.schedule_process(0, 0, true, noop()),
            Err(KernelError::ShutDown { .. })
        ));
        assert!(evt.resume(10).is_err());
    }

    #[test]
    fn time_scale_conversions() {
        let evt = EventManager::with_name("scale").unwrap();
        assert_eq!(evt.seconds_to_nearest_tick(2.0), 2_000_000);
        evt.set_ticks_per_second(10.0).unwrap();
        assert_eq!(evt.seconds_to_nearest_tick(2.04), 20);
        assert!((evt.ticks_to_seconds(15) - 1.5).abs() < 1e-12);
        assert!(evt.set_ticks_per_second(-1.0).is_err());
        evt.shutdown().unwrap();
    }
}
