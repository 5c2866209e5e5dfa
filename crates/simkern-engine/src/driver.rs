//! The driver thread: dispatches events in order, offers conditional
//! waiters a look before each clock advance, and paces the clock against
//! the wall clock when real-time execution is on.

use std::sync::Arc;
use std::time::Instant;

use crate::event::EventTarget;
use crate::manager::Kernel;

/// Driver thread body. Returns once the kernel is shut down.
pub(crate) fn run(kernel: Arc<Kernel>) {
    let k = &kernel;
    let mut st = k.lock();
    tracing::debug!(manager = %k.name(), "driver started");

    loop {
        if st.shutdown {
            break;
        }

        let head_tick = st.events.head().map(|e| e.tick());
        if head_tick.is_none_or(|t| t >= st.target_tick) {
            st.execute_events = false;
        }

        if !st.execute_events {
            if st.running {
                st.running = false;
                st.time_listener.time_running(false);
                tracing::debug!(manager = %k.name(), tick = st.current_tick, "driver idle");
                k.notify();
            }
            while !st.execute_events && !st.shutdown {
                st = k.wait(st);
            }
            continue;
        }

        // The gate is open, so the list has a head.
        let Some(head_tick) = head_tick else {
            continue;
        };

        if head_tick <= st.current_tick {
            let Some(event) = st.events.pop_head() else {
                continue;
            };
            tracing::trace!(
                manager = %k.name(),
                tick = st.current_tick,
                event = %event.description(),
                "dispatch"
            );
            if let Some(trace) = &st.trace_listener {
                trace.trace_event(k.name(), st.current_tick, &event);
            }
            let process = match event.into_target() {
                EventTarget::Wait(wait) => wait.into_process(),
                EventTarget::Target(target) => match k.allocate(target) {
                    Ok(process) => process,
                    Err(e) => {
                        k.report_failure(&mut st, &e.into());
                        continue;
                    }
                },
            };
            process.slot().next = None;
            st = k.switch_from_driver(st, &process);
            continue;
        }

        // Work scheduled from outside while pacing may land before the
        // tick the clock is heading for.
        if head_tick < st.next_tick {
            st.next_tick = head_tick;
        }

        if head_tick > st.next_tick {
            if let Some(first) = st.conditional.first().cloned() {
                for pair in st.conditional.windows(2) {
                    pair[0].slot().next = Some(pair[1].clone());
                }
                if let Some(last) = st.conditional.last() {
                    last.slot().next = None;
                }
                st = k.switch_from_driver(st, &first);
            }

            // A satisfied waiter requeues itself at the current tick.
            let Some(head) = st.events.head() else {
                continue;
            };
            st.next_tick = head.tick();
            if st.next_tick <= st.current_tick || !st.execute_events {
                continue;
            }
        }

        if st.real_time.enabled {
            let scale = st.time_scale;
            let current = st.current_tick;
            let paced = st.real_time.paced_tick(current, &scale, Instant::now());
            if paced < st.next_tick {
                st.current_tick = paced.max(current);
                st.time_listener.tick_update(st.current_tick);
                let slice = st.pacing_slice;
                st = k.wait_timeout(st, slice);
                continue;
            }
        }

        st.current_tick = st.next_tick;
        st.time_listener.tick_update(st.current_tick);
    }

    st.running = false;
    k.notify();
    tracing::debug!(manager = %k.name(), "driver stopped");
}
