//! Error types for the simkern event kernel.
//!
//! Organized by who observes them: [`KernelError`] for usage errors the
//! kernel rejects at its API boundary, [`ProcessError`] for what flows
//! out of a running process (including the cancellation signal), and
//! [`ConfigError`] for construction-time validation.

use std::error::Error;
use std::fmt;

use crate::tick::Tick;

/// A violated precondition at the kernel API.
///
/// Every variant names the event manager that rejected the call. The
/// kernel state (queue, conditional list, clock) is unchanged when one
/// of these is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelError {
    /// A wait or schedule was requested with a negative duration.
    NegativeDuration {
        /// Name of the event manager.
        manager: String,
        /// The rejected duration.
        ticks: Tick,
    },
    /// No pending event or conditional registration belongs to the process.
    ProcessNotFound {
        /// Name of the event manager.
        manager: String,
    },
    /// No pending event references the target.
    TargetNotFound {
        /// Name of the event manager.
        manager: String,
    },
    /// The operation is not allowed on the currently executing process.
    ActiveProcess {
        /// Name of the event manager.
        manager: String,
        /// The rejected operation.
        operation: &'static str,
    },
    /// The calling thread is not a kernel process.
    NotAProcess {
        /// Name of the event manager.
        manager: String,
        /// The rejected operation.
        operation: &'static str,
    },
    /// The calling process does not hold control of this manager.
    NotActive {
        /// Name of the event manager.
        manager: String,
        /// The rejected operation.
        operation: &'static str,
    },
    /// Real-time factor is NaN, infinite, zero, or negative.
    InvalidRealTimeFactor {
        /// Name of the event manager.
        manager: String,
        /// The rejected factor.
        factor: f64,
    },
    /// Ticks-per-second is NaN, infinite, zero, or negative.
    InvalidTimeScale {
        /// Name of the event manager.
        manager: String,
        /// The rejected value.
        ticks_per_second: f64,
    },
    /// A blocking control call was made from inside a kernel process.
    CalledFromProcess {
        /// Name of the event manager.
        manager: String,
        /// The rejected operation.
        operation: &'static str,
    },
    /// A new carrier thread could not be spawned.
    CarrierSpawnFailed {
        /// Name of the event manager.
        manager: String,
        /// Error reported by the OS.
        reason: String,
    },
    /// The calling process was terminated and is unwinding; it may not
    /// schedule further work.
    ProcessTerminated {
        /// Name of the event manager.
        manager: String,
    },
    /// The manager's driver thread has been shut down.
    ShutDown {
        /// Name of the event manager.
        manager: String,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDuration { manager, ticks } => {
                write!(f, "EVT:{manager} - negative duration wait is invalid ({ticks} ticks)")
            }
            Self::ProcessNotFound { manager } => {
                write!(f, "EVT:{manager} - process not found in the event list")
            }
            Self::TargetNotFound { manager } => {
                write!(f, "EVT:{manager} - process target not found in the event list")
            }
            Self::ActiveProcess { manager, operation } => {
                write!(f, "EVT:{manager} - cannot {operation} an active process")
            }
            Self::NotAProcess { manager, operation } => {
                write!(f, "EVT:{manager} - {operation} called from a non-process thread")
            }
            Self::NotActive { manager, operation } => {
                write!(f, "EVT:{manager} - {operation} called by a process without control")
            }
            Self::InvalidRealTimeFactor { manager, factor } => {
                write!(f, "EVT:{manager} - real-time factor must be finite and positive, got {factor}")
            }
            Self::InvalidTimeScale {
                manager,
                ticks_per_second,
            } => {
                write!(
                    f,
                    "EVT:{manager} - ticks_per_second must be finite and positive, got {ticks_per_second}"
                )
            }
            Self::CalledFromProcess { manager, operation } => {
                write!(f, "EVT:{manager} - {operation} would block the calling process")
            }
            Self::CarrierSpawnFailed { manager, reason } => {
                write!(f, "EVT:{manager} - failed to spawn process carrier: {reason}")
            }
            Self::ProcessTerminated { manager } => {
                write!(f, "EVT:{manager} - process has been terminated")
            }
            Self::ShutDown { manager } => write!(f, "EVT:{manager} - event manager is shut down"),
        }
    }
}

impl Error for KernelError {}

/// Outcome of running a process target, or of a suspension inside one.
///
/// [`ProcessError::Terminated`] is the cancellation signal: a parked
/// process that was terminated sees it when it would next resume. Targets
/// propagate it with `?`; the carrier treats it as "abandon this target"
/// rather than as a failure.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessError {
    /// The process was terminated while parked.
    Terminated,
    /// A kernel call made by the target was rejected.
    Kernel(KernelError),
    /// The target reported a domain failure.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The target panicked.
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl ProcessError {
    /// Shorthand for a [`ProcessError::Failed`] with the given reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// True for the cancellation signal.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated => write!(f, "process terminated"),
            Self::Kernel(e) => write!(f, "kernel error: {e}"),
            Self::Failed { reason } => write!(f, "process failed: {reason}"),
            Self::Panicked { message } => write!(f, "process panicked: {message}"),
        }
    }
}

impl Error for ProcessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kernel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KernelError> for ProcessError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::ProcessTerminated { .. } => Self::Terminated,
            e => Self::Kernel(e),
        }
    }
}

/// Errors detected while validating an event manager configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The manager name is empty.
    EmptyName,
    /// ticks_per_second is NaN, infinite, zero, or negative.
    InvalidTimeScale {
        /// The invalid value.
        value: f64,
    },
    /// Real-time factor is NaN, infinite, zero, or negative.
    InvalidRealTimeFactor {
        /// The invalid value.
        value: f64,
    },
    /// The pacing slice is zero.
    ZeroPacingSlice,
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "event manager name must not be empty"),
            Self::InvalidTimeScale { value } => {
                write!(f, "ticks_per_second must be finite and positive, got {value}")
            }
            Self::InvalidRealTimeFactor { value } => {
                write!(f, "real-time factor must be finite and positive, got {value}")
            }
            Self::ZeroPacingSlice => write!(f, "pacing slice must be non-zero"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}
