//! Event manager, process carriers and driver loop for simkern.
//!
//! An [`EventManager`] owns a simulation clock and a future-event list.
//! Domain work implements [`ProcessTarget`] and is scheduled at a delay
//! relative to the current tick; the manager's driver thread dispatches
//! events strictly in `(tick, priority, arrival)` order and hands each
//! one to a pooled [`Process`] carrier. A running target can suspend
//! mid-execution with [`EventManager::wait_ticks`] or the
//! [`wait_until`](EventManager::wait_until) /
//! [`wait_until_ended`](EventManager::wait_until_ended) pair, and other
//! work can interrupt or terminate it while it is parked.
//!
//! # Architecture
//!
//! ```text
//! Driver thread (evt-<name>)          Carrier threads (simkern-proc-N)
//!     |                                   |
//!     | head.tick == current_tick         | parked on assignment channel
//!     | pop event, bind carrier --------->| park until resumed
//!     | park until control returns        | target.process(&manager)
//!     |                                   |   wait_ticks(): queue WaitTarget,
//!     |<-------- resume next / driver ----|   hand control back, park
//!     | conditional waiters, if any       |
//!     | advance clock (paced or not)      | finish: release, back to pool
//! ```
//!
//! Exactly one carrier per manager holds control at a time. All hand-offs
//! happen under the manager lock with sticky resume flags, so a resume
//! issued before the target parks is never lost.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
mod driver;
pub mod event;
pub mod listener;
pub mod manager;
pub mod pool;
pub mod process;
mod queue;
pub mod target;
mod wait;

pub use config::EventManagerConfig;
pub use event::{Event, EventSummary};
pub use listener::{ErrorListener, LogErrorListener, TimeListener, TraceListener};
pub use manager::EventManager;
pub use pool::{ProcessPool, MAX_IDLE_CARRIERS};
pub use process::{Process, ProcessState};
pub use target::{FnTarget, ProcessTarget};

pub use simkern_core::{ConfigError, KernelError, ProcessError, ProcessId, Tick, TimeScale, MAX_TICK};
