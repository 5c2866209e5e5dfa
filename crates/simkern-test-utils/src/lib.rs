//! Test utilities for simkern development.
//!
//! Provides a shared [`Recorder`] log for asserting dispatch order,
//! targets that write to it, and recording implementations of the
//! listener traits ([`TraceRecorder`], [`ErrorCollector`],
//! [`TickRecorder`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simkern_core::{ProcessError, Tick};
use simkern_engine::{
    ErrorListener, Event, EventManager, EventManagerConfig, FnTarget, ProcessTarget, TimeListener,
    TraceListener,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event manager with a small queue and a coarse time scale, suited to
/// unit tests.
pub fn test_manager(name: &str) -> EventManager {
    let config = EventManagerConfig {
        initial_capacity: 16,
        ..EventManagerConfig::named(name)
    };
    EventManager::new(config).expect("test manager config is valid")
}

// ── Recorder ─────────────────────────────────────────────────────

/// Append-only, thread-safe log of string entries.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Target that records `"{label}@{tick}"` and finishes.
    pub fn target(&self, label: &str) -> Arc<dyn ProcessTarget> {
        let rec = self.clone();
        let label = label.to_owned();
        FnTarget::shared(label.clone(), move |evt: &EventManager| {
            rec.record(format!("{label}@{}", evt.current_tick()));
            Ok(())
        })
    }

    /// Target that records `"{label}@{tick}"`, waits `ticks`, records
    /// again and finishes.
    pub fn waiting_target(&self, label: &str, ticks: Tick) -> Arc<dyn ProcessTarget> {
        let rec = self.clone();
        let label = label.to_owned();
        FnTarget::shared(label.clone(), move |evt: &EventManager| {
            rec.record(format!("{label}@{}", evt.current_tick()));
            evt.wait_ticks(ticks, 0, true)?;
            rec.record(format!("{label}@{}", evt.current_tick()));
            Ok(())
        })
    }
}

// ── TraceRecorder ────────────────────────────────────────────────

/// [`TraceListener`] that logs one line per callback.
#[derive(Clone, Default)]
pub struct TraceRecorder {
    pub log: Recorder,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.log.entries()
    }
}

impl TraceListener for TraceRecorder {
    fn trace_event(&self, _manager: &str, now: Tick, event: &Event) {
        self.log.record(format!("event {now} {}", event.description()));
    }

    fn trace_sched_process(&self, _manager: &str, now: Tick, event: &Event) {
        self.log.record(format!(
            "sched {now} {}@{} from {}",
            event.description(),
            event.tick(),
            event.scheduled_at()
        ));
    }

    fn trace_wait(&self, _manager: &str, now: Tick, event: &Event) {
        self.log.record(format!("wait {now} until {}", event.tick()));
    }

    fn trace_wait_until(&self, _manager: &str, now: Tick) {
        self.log.record(format!("wait_until {now}"));
    }

    fn trace_wait_until_ended(&self, _manager: &str, now: Tick, _event: &Event) {
        self.log.record(format!("wait_until_ended {now}"));
    }

    fn trace_interrupt(&self, _manager: &str, now: Tick, event: &Event) {
        self.log.record(format!("interrupt {now} {}", event.description()));
    }

    fn trace_kill(&self, _manager: &str, now: Tick, event: &Event) {
        self.log.record(format!("kill {now} {}", event.description()));
    }

    fn trace_process_start(&self, _manager: &str, now: Tick, description: &str) {
        self.log.record(format!("start {now} {description}"));
    }

    fn trace_process_end(&self, _manager: &str, now: Tick) {
        self.log.record(format!("end {now}"));
    }
}

// ── ErrorCollector ───────────────────────────────────────────────

/// A failure reported to an [`ErrorCollector`].
#[derive(Clone, Debug, PartialEq)]
pub struct CollectedError {
    pub manager: String,
    pub message: String,
    pub tick: Tick,
}

/// [`ErrorListener`] that keeps every report.
#[derive(Clone, Default)]
pub struct ErrorCollector {
    errors: Arc<Mutex<Vec<CollectedError>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<CollectedError> {
        lock(&self.errors).clone()
    }
}

impl ErrorListener for ErrorCollector {
    fn handle_error(&self, manager: &str, error: &ProcessError, tick: Tick) {
        lock(&self.errors).push(CollectedError {
            manager: manager.to_owned(),
            message: error.to_string(),
            tick,
        });
    }
}

// ── TickRecorder ─────────────────────────────────────────────────

/// [`TimeListener`] that keeps every tick update and running transition.
#[derive(Clone, Default)]
pub struct TickRecorder {
    ticks: Arc<Mutex<Vec<Tick>>>,
    running: Arc<Mutex<Vec<bool>>>,
}

impl TickRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> Vec<Tick> {
        lock(&self.ticks).clone()
    }

    pub fn running_transitions(&self) -> Vec<bool> {
        lock(&self.running).clone()
    }
}

impl TimeListener for TickRecorder {
    fn tick_update(&self, tick: Tick) {
        lock(&self.ticks).push(tick);
    }

    fn time_running(&self, running: bool) {
        lock(&self.running).push(running);
    }
}
