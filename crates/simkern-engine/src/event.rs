//! Scheduled dispatches held in the future-event list.

use std::fmt;
use std::sync::Arc;

use simkern_core::{ProcessId, Tick};

use crate::process::Process;
use crate::target::{same_target, ProcessTarget};
use crate::wait::WaitTarget;

/// What an event runs when it is dispatched.
pub(crate) enum EventTarget {
    /// Fresh work: bound to a pooled carrier at dispatch.
    Target(Arc<dyn ProcessTarget>),
    /// A parked process resuming.
    Wait(WaitTarget),
}

/// A scheduled future dispatch.
///
/// Immutable once created. Ordering in the future-event list is by
/// `tick`, then `priority` (lower first), then the FIFO/LIFO policy
/// chosen when the event was inserted.
pub struct Event {
    scheduled_at: Tick,
    tick: Tick,
    priority: i32,
    target: EventTarget,
}

impl Event {
    pub(crate) fn new(scheduled_at: Tick, tick: Tick, priority: i32, target: EventTarget) -> Self {
        Self {
            scheduled_at,
            tick,
            priority,
            target,
        }
    }

    /// Tick at which the event was created.
    pub fn scheduled_at(&self) -> Tick {
        self.scheduled_at
    }

    /// Tick at which the event fires.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Priority among events at the same tick. Lower runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub(crate) fn key(&self) -> (Tick, i32) {
        (self.tick, self.priority)
    }

    /// Description of the work this event runs.
    pub fn description(&self) -> String {
        match &self.target {
            EventTarget::Target(t) => t.description(),
            EventTarget::Wait(w) => format!("resume {}", w.process().name()),
        }
    }

    /// The carrier this event resumes, for wait events.
    pub fn process_id(&self) -> Option<ProcessId> {
        self.process().map(Process::id)
    }

    pub(crate) fn process(&self) -> Option<&Process> {
        match &self.target {
            EventTarget::Wait(w) => Some(w.process()),
            EventTarget::Target(_) => None,
        }
    }

    pub(crate) fn is_target(&self, target: &Arc<dyn ProcessTarget>) -> bool {
        match &self.target {
            EventTarget::Target(t) => same_target(t, target),
            EventTarget::Wait(_) => false,
        }
    }

    pub(crate) fn into_target(self) -> EventTarget {
        self.target
    }

    /// Owned snapshot of this event for diagnostics.
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            scheduled_at: self.scheduled_at,
            tick: self.tick,
            priority: self.priority,
            description: self.description(),
            process: self.process_id(),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("scheduled_at", &self.scheduled_at)
            .field("tick", &self.tick)
            .field("priority", &self.priority)
            .field("target", &self.description())
            .finish()
    }
}

/// Owned copy of an event's public fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSummary {
    /// Tick at which the event was created.
    pub scheduled_at: Tick,
    /// Tick at which the event fires.
    pub tick: Tick,
    /// Priority among same-tick events.
    pub priority: i32,
    /// Description of the target.
    pub description: String,
    /// Carrier resumed by this event, for wait events.
    pub process: Option<ProcessId>,
}
