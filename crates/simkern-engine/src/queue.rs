//! Array-backed future-event list with binary-search insertion.
//!
//! Events are stored in reverse dispatch order so that the head (the
//! next event to run) is the last element: dispatch is a `pop`, and
//! insertion is a `partition_point` search followed by one shift.
//!
//! # Ordering
//!
//! Dispatch order is by the composite key `(tick, priority)`, ascending.
//! Among equal keys the caller picks per insertion:
//! - FIFO: the new event runs after every existing equal-key event.
//! - LIFO: the new event runs before every existing equal-key event.

use std::sync::Arc;

use simkern_core::Tick;

use crate::event::Event;
use crate::process::Process;
use crate::target::ProcessTarget;

pub(crate) struct EventList {
    /// Reverse dispatch order: `events.last()` is the head.
    events: Vec<Event>,
}

impl EventList {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// The next event to dispatch.
    pub(crate) fn head(&self) -> Option<&Event> {
        self.events.last()
    }

    pub(crate) fn pop_head(&mut self) -> Option<Event> {
        self.events.pop()
    }

    /// Insert `event` at its ordered position.
    pub(crate) fn insert(&mut self, event: Event, fifo: bool) {
        let key = event.key();
        // Storage is descending, so everything that dispatches after the
        // new event forms a prefix.
        let idx = self.events.partition_point(|e| {
            if fifo {
                e.key() > key
            } else {
                e.key() >= key
            }
        });
        self.events.insert(idx, event);
    }

    /// The pending event with exactly this tick, priority and target, if
    /// any. Scans from the head and stops past `tick`.
    pub(crate) fn find(
        &self,
        tick: Tick,
        priority: i32,
        target: &Arc<dyn ProcessTarget>,
    ) -> Option<&Event> {
        self.events
            .iter()
            .rev()
            .take_while(|e| e.tick() <= tick)
            .find(|e| e.tick() == tick && e.priority() == priority && e.is_target(target))
    }

    /// Remove and return the earliest pending event that resumes `process`.
    pub(crate) fn remove_process(&mut self, process: &Process) -> Option<Event> {
        let idx = self
            .events
            .iter()
            .rposition(|e| e.process().is_some_and(|p| p == process))?;
        Some(self.events.remove(idx))
    }

    /// Remove and return the earliest pending event for `target`.
    pub(crate) fn remove_target(&mut self, target: &Arc<dyn ProcessTarget>) -> Option<Event> {
        let idx = self.events.iter().rposition(|e| e.is_target(target))?;
        Some(self.events.remove(idx))
    }

    /// Iterate in dispatch order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().rev()
    }

    /// Remove every event, returning them in dispatch order.
    pub(crate) fn drain(&mut self) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.events);
        events.reverse();
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTarget;
    use crate::target::FnTarget;

    fn target(name: &str) -> Arc<dyn ProcessTarget> {
        FnTarget::shared(name, |_| Ok(()))
    }

    fn event(tick: Tick, priority: i32, name: &str) -> Event {
        Event::new(0, tick, priority, EventTarget::Target(target(name)))
    }

    fn order(list: &EventList) -> Vec<String> {
        list.iter().map(Event::description).collect()
    }

    // ── ordering ────────────────────────────────────────────────

    #[test]
    fn tick_then_priority() {
        let mut list = EventList::with_capacity(4);
        list.insert(event(5, 5, "A"), true);
        list.insert(event(5, 1, "B"), true);
        list.insert(event(0, 5, "C"), true);
        assert_eq!(order(&list), ["C", "B", "A"]);
        assert_eq!(list.head().unwrap().description(), "C");
    }

    #[test]
    fn fifo_ties_keep_arrival_order() {
        let mut list = EventList::with_capacity(4);
        for name in ["a", "b", "c"] {
            list.insert(event(3, 2, name), true);
        }
        assert_eq!(order(&list), ["a", "b", "c"]);
    }

    #[test]
    fn lifo_ties_reverse_arrival_order() {
        let mut list = EventList::with_capacity(4);
        for name in ["a", "b", "c"] {
            list.insert(event(3, 2, name), false);
        }
        assert_eq!(order(&list), ["c", "b", "a"]);
    }

    #[test]
    fn mixed_policies_apply_at_insertion() {
        let mut list = EventList::with_capacity(4);
        list.insert(event(1, 0, "first"), true);
        list.insert(event(1, 0, "jumper"), false);
        list.insert(event(1, 0, "tail"), true);
        assert_eq!(order(&list), ["jumper", "first", "tail"]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut list = EventList::with_capacity(1);
        for i in 0..100 {
            list.insert(event(100 - i, 0, "x"), true);
        }
        assert_eq!(list.len(), 100);
        assert_eq!(list.head().unwrap().tick(), 1);
    }

    // ── lookup and removal ──────────────────────────────────────

    #[test]
    fn find_matches_identity_tick_and_priority() {
        let t = target("t");
        let mut list = EventList::with_capacity(4);
        list.insert(Event::new(2, 7, 3, EventTarget::Target(Arc::clone(&t))), true);
        let found = list.find(7, 3, &t).unwrap();
        assert_eq!(found.scheduled_at(), 2);
        assert!(list.find(7, 4, &t).is_none());
        assert!(list.find(8, 3, &t).is_none());
        assert!(list.find(7, 3, &target("t")).is_none());
    }

    #[test]
    fn remove_target_compacts() {
        let t = target("mid");
        let mut list = EventList::with_capacity(4);
        list.insert(event(1, 0, "a"), true);
        list.insert(Event::new(0, 2, 0, EventTarget::Target(Arc::clone(&t))), true);
        list.insert(event(3, 0, "c"), true);
        let removed = list.remove_target(&t).unwrap();
        assert_eq!(removed.tick(), 2);
        assert_eq!(order(&list), ["a", "c"]);
        assert!(list.remove_target(&t).is_none());
    }

    #[test]
    fn drain_returns_dispatch_order() {
        let mut list = EventList::with_capacity(4);
        list.insert(event(9, 0, "late"), true);
        list.insert(event(1, 0, "early"), true);
        let drained: Vec<_> = list.drain().iter().map(Event::description).collect();
        assert_eq!(drained, ["early", "late"]);
        assert!(list.head().is_none());
    }

    // ── proptest ───────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn dispatch_order_respects_key_and_tie_break(
                inserts in prop::collection::vec((0i64..8, 0i32..4, any::<bool>()), 0..64),
            ) {
                let mut list = EventList::with_capacity(8);
                for (seq, (tick, priority, fifo)) in inserts.iter().enumerate() {
                    list.insert(event(*tick, *priority, &seq.to_string()), *fifo);
                }

                let dispatched: Vec<(Tick, i32, usize)> = list
                    .drain()
                    .iter()
                    .map(|e| (e.tick(), e.priority(), e.description().parse().unwrap()))
                    .collect();

                for w in dispatched.windows(2) {
                    prop_assert!((w[0].0, w[0].1) <= (w[1].0, w[1].1));
                }

                // Reference model: replay inserts into a plain Vec in
                // dispatch order using the documented tie-break rule.
                let mut model: Vec<(Tick, i32, usize)> = Vec::new();
                for (seq, (tick, priority, fifo)) in inserts.iter().enumerate() {
                    let key = (*tick, *priority);
                    let idx = if *fifo {
                        model.partition_point(|m| (m.0, m.1) <= key)
                    } else {
                        model.partition_point(|m| (m.0, m.1) < key)
                    };
                    model.insert(idx, (*tick, *priority, seq));
                }
                prop_assert_eq!(dispatched, model);
            }
        }
    }
}
