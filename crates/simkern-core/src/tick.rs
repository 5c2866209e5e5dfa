//! Simulation clock units and continuous-time conversion.
//!
//! The kernel keeps time as a signed 64-bit tick count. Durations are
//! validated to be non-negative before they are added to the clock, and
//! the addition saturates at [`MAX_TICK`] so a very long wait parks the
//! caller "forever" instead of wrapping into the past.

/// Integral unit of simulated time.
pub type Tick = i64;

/// Largest representable tick. Saturated schedules land here.
pub const MAX_TICK: Tick = i64::MAX;

/// Resolve the absolute tick of an event `delay` ticks after `current`.
///
/// Returns `None` for a negative delay. Overflow saturates to
/// [`MAX_TICK`].
pub fn event_tick(current: Tick, delay: Tick) -> Option<Tick> {
    if delay < 0 {
        return None;
    }
    Some(current.saturating_add(delay))
}

/// Conversion factor between ticks and simulated seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScale {
    ticks_per_second: f64,
}

impl TimeScale {
    /// Default resolution: one tick per simulated microsecond.
    pub const DEFAULT_TICKS_PER_SECOND: f64 = 1_000_000.0;

    /// Build a time scale. Returns `None` unless `ticks_per_second` is
    /// finite and strictly positive.
    pub fn new(ticks_per_second: f64) -> Option<Self> {
        if ticks_per_second.is_finite() && ticks_per_second > 0.0 {
            Some(Self { ticks_per_second })
        } else {
            None
        }
    }

    /// Ticks per simulated second.
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    /// Round a duration in seconds to the nearest whole tick.
    ///
    /// Out-of-range values clamp to the `i64` range (float-to-int casts
    /// saturate), NaN maps to zero.
    pub fn seconds_to_nearest_tick(&self, seconds: f64) -> Tick {
        (seconds * self.ticks_per_second).round() as Tick
    }

    /// Number of simulated seconds covered by `ticks`.
    pub fn ticks_to_seconds(&self, ticks: Tick) -> f64 {
        ticks as f64 / self.ticks_per_second
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            ticks_per_second: Self::DEFAULT_TICKS_PER_SECOND,
        }
    }
}
