//! Core types for the simkern discrete-event kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the simulation tick and its time-scale conversions, process
//! identifiers, and the error taxonomy shared by the engine and its
//! consumers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod tick;

pub use error::{ConfigError, KernelError, ProcessError};
pub use id::ProcessId;
pub use tick::{Tick, TimeScale, MAX_TICK};
