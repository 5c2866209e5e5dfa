//! A single-server service desk, written as sequential processes.
//!
//! Demonstrates:
//!   1. Scheduling arrivals with `schedule_process`
//!   2. Holding for service time with `wait_seconds`
//!   3. Blocking on a condition with `wait_until` / `wait_until_ended`
//!   4. Observing the run with a `TraceListener` and the error listener
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example service_desk

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use simkern_engine::{
    Event, EventManager, EventManagerConfig, FnTarget, ProcessError, ProcessTarget, Tick,
    TraceListener, MAX_TICK,
};
use tracing_subscriber::EnvFilter;

// ─── Parameters ─────────────────────────────────────────────────

const CUSTOMERS: u32 = 5;
const ARRIVAL_GAP_SECS: f64 = 2.0;
const SERVICE_SECS: f64 = 3.5;

// ─── Shared desk state ──────────────────────────────────────────

#[derive(Default)]
struct Desk {
    busy: AtomicBool,
    served: AtomicU32,
}

// ─── Customer process ───────────────────────────────────────────

struct Customer {
    id: u32,
    desk: Arc<Desk>,
}

impl ProcessTarget for Customer {
    fn description(&self) -> String {
        format!("customer-{}", self.id)
    }

    fn process(&self, evt: &EventManager) -> Result<(), ProcessError> {
        let arrived = evt.current_tick();
        while self.desk.busy.load(Ordering::SeqCst) {
            evt.wait_until()?;
        }
        // Claim the desk before rejoining the event list so later waiters
        // in the same pass see it taken.
        self.desk.busy.store(true, Ordering::SeqCst);
        evt.wait_until_ended()?;

        let queued = evt.ticks_to_seconds(evt.current_tick() - arrived);
        println!(
            "t={:>5.1}s  customer-{} starts service (queued {queued:.1}s)",
            evt.ticks_to_seconds(evt.current_tick()),
            self.id
        );
        evt.wait_seconds(SERVICE_SECS, 0, true)?;

        self.desk.busy.store(false, Ordering::SeqCst);
        self.desk.served.fetch_add(1, Ordering::SeqCst);
        println!(
            "t={:>5.1}s  customer-{} leaves",
            evt.ticks_to_seconds(evt.current_tick()),
            self.id
        );
        Ok(())
    }
}

// ─── Arrival generator ──────────────────────────────────────────

struct Arrivals {
    desk: Arc<Desk>,
    next_id: AtomicU32,
}

impl ProcessTarget for Arrivals {
    fn description(&self) -> String {
        "arrivals".to_string()
    }

    fn process(&self, evt: &EventManager) -> Result<(), ProcessError> {
        for _ in 0..CUSTOMERS {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            evt.start_process(Arc::new(Customer {
                id,
                desk: Arc::clone(&self.desk),
            }))?;
            evt.wait_seconds(ARRIVAL_GAP_SECS, 0, true)?;
        }
        Ok(())
    }
}

// ─── Tracing ────────────────────────────────────────────────────

struct LogTrace;

impl TraceListener for LogTrace {
    fn trace_event(&self, manager: &str, now: Tick, event: &Event) {
        tracing::debug!(manager, now, event = %event.description(), "dispatch");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = EventManagerConfig {
        ticks_per_second: 10.0,
        ..EventManagerConfig::named("desk")
    };
    let evt = EventManager::new(config)?;
    evt.set_trace_listener(Some(Arc::new(LogTrace)));

    let desk = Arc::new(Desk::default());
    let arrivals = Arc::new(Arrivals {
        desk: Arc::clone(&desk),
        next_id: AtomicU32::new(1),
    });
    evt.schedule_process(0, 0, true, arrivals)?;

    // Conditional waiters are only re-tested when other work is pending,
    // so keep a sentinel event beyond the end of the run.
    let horizon = evt.seconds_to_nearest_tick(60.0);
    let sentinel = FnTarget::shared("horizon", |_: &EventManager| Ok(()));
    evt.schedule_process(horizon, 0, true, sentinel)?;

    evt.run_until(MAX_TICK)?;
    println!(
        "served {} customers by t={:.1}s",
        desk.served.load(Ordering::SeqCst),
        evt.ticks_to_seconds(evt.current_tick())
    );
    evt.shutdown()?;
    Ok(())
}
