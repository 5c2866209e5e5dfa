//! simkern: a discrete-event simulation kernel.
//!
//! Simulation logic is written as ordinary sequential code that suspends
//! in simulated time. This facade re-exports the public API of the
//! simkern sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use simkern::prelude::*;
//!
//! let evt = EventManager::with_name("quickstart").unwrap();
//! let arrive = FnTarget::shared("arrive", |evt: &EventManager| {
//!     // Hold for 5 ticks, then finish.
//!     evt.wait_ticks(5, 0, true)?;
//!     assert_eq!(evt.current_tick(), 5);
//!     Ok(())
//! });
//! evt.schedule_process(0, 0, true, arrive).unwrap();
//! evt.run_until(MAX_TICK).unwrap();
//! assert_eq!(evt.current_tick(), 5);
//! evt.shutdown().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `simkern-core` | Ticks, time scale, ids, errors |
//! | [`engine`] | `simkern-engine` | Event manager, processes, listeners |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ticks, time scale, ids and error types (`simkern-core`).
pub use simkern_core as types;

/// Event manager, process carriers and listeners (`simkern-engine`).
///
/// [`engine::EventManager`] is the entry point; domain work implements
/// [`engine::ProcessTarget`].
pub use simkern_engine as engine;

/// Common imports for typical simkern usage.
///
/// ```rust
/// use simkern::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use simkern_core::{ConfigError, KernelError, ProcessError, Tick, MAX_TICK};

    // Engine
    pub use simkern_engine::{
        ErrorListener, EventManager, EventManagerConfig, FnTarget, Process, ProcessTarget,
        TimeListener, TraceListener,
    };
}
