//! Benchmark workloads for the simkern event kernel.
//!
//! - [`random_delays`]: seeded delay streams for schedule churn
//! - [`churn_profile`]: a manager preloaded with that stream
//! - [`sleepers`]: targets that repeatedly suspend, to stress hand-offs

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simkern_core::Tick;
use simkern_engine::{EventManager, EventManagerConfig, FnTarget, ProcessTarget};

/// `n` delays in `0..max_delay`, identical for identical seeds.
pub fn random_delays(n: usize, max_delay: Tick, seed: u64) -> Vec<Tick> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..max_delay.max(1))).collect()
}

/// Target that only counts its dispatches.
pub fn counting_target(counter: Arc<AtomicU64>) -> Arc<dyn ProcessTarget> {
    FnTarget::shared("count", move |_: &EventManager| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    })
}

/// A paused manager with `n` counting events at seeded random delays and
/// random priorities.
pub fn churn_profile(
    name: &str,
    n: usize,
    seed: u64,
    counter: Arc<AtomicU64>,
) -> Result<EventManager, Box<dyn Error>> {
    let config = EventManagerConfig {
        initial_capacity: n,
        ..EventManagerConfig::named(name)
    };
    let evt = EventManager::new(config)?;
    let target = counting_target(counter);
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
    for delay in random_delays(n, 1_000, seed) {
        let priority = rng.random_range(0..10);
        evt.schedule_process(delay, priority, rng.random(), Arc::clone(&target))?;
    }
    Ok(evt)
}

/// Target that suspends `rounds` times for `step` ticks each.
pub fn sleepers(rounds: u32, step: Tick) -> Arc<dyn ProcessTarget> {
    FnTarget::shared("sleeper", move |evt: &EventManager| {
        for _ in 0..rounds {
            evt.wait_ticks(step, 0, true)?;
        }
        Ok(())
    })
}
