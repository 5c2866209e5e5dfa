//! Event manager configuration and validation.
//!
//! [`EventManagerConfig`] is the builder input for
//! [`EventManager::new`](crate::EventManager::new).
//! [`validate()`](EventManagerConfig::validate) checks it before any
//! thread is spawned.

use std::time::Duration;

use simkern_core::{ConfigError, TimeScale};

/// Configuration for an [`EventManager`](crate::EventManager).
#[derive(Clone, Debug)]
pub struct EventManagerConfig {
    /// Name used in error messages, logs and the driver thread name.
    pub name: String,
    /// Ticks per simulated second. Default: 1 000 000.
    pub ticks_per_second: f64,
    /// Initial capacity of the future-event list. Grows on demand.
    /// Default: 10 000.
    pub initial_capacity: usize,
    /// Start with real-time pacing at this factor (simulated seconds per
    /// wall-clock second). `None` = run as fast as possible.
    pub real_time_factor: Option<f64>,
    /// Longest single sleep of the driver while pacing. Default: 20 ms.
    pub pacing_slice: Duration,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            name: "simkern".into(),
            ticks_per_second: TimeScale::DEFAULT_TICKS_PER_SECOND,
            initial_capacity: 10_000,
            real_time_factor: None,
            pacing_slice: Duration::from_millis(20),
        }
    }
}

impl EventManagerConfig {
    /// Default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if TimeScale::new(self.ticks_per_second).is_none() {
            return Err(ConfigError::InvalidTimeScale {
                value: self.ticks_per_second,
            });
        }
        if let Some(factor) = self.real_time_factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(ConfigError::InvalidRealTimeFactor { value: factor });
            }
        }
        if self.pacing_slice.is_zero() {
            return Err(ConfigError::ZeroPacingSlice);
        }
        Ok(())
    }

    /// Time scale derived from `ticks_per_second`.
    pub(crate) fn time_scale(&self) -> Result<TimeScale, ConfigError> {
        TimeScale::new(self.ticks_per_second).ok_or(ConfigError::InvalidTimeScale {
            value: self.ticks_per_second,
        })
    }
}
