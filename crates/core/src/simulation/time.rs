//! Virtual time for deterministic channel simulation.
//!
//! Simulated time is a monotonically increasing nanosecond counter that only
//! moves when the simulation logic advances it. Nothing in the simulator ever
//! blocks or consults the wall clock.

use std::time::Duration;

/// Monotonic virtual clock.
///
/// Time only advances when explicitly stepped via [`advance`](Self::advance)
/// or [`advance_to`](Self::advance_to); attempts to move it backwards are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualTime {
    current_nanos: u64,
}

impl VirtualTime {
    /// Creates a new virtual time starting at 0.
    pub fn new() -> Self {
        Self::with_initial_time(0)
    }

    /// Creates a new virtual time starting at the given nanoseconds.
    pub fn with_initial_time(initial_nanos: u64) -> Self {
        Self {
            current_nanos: initial_nanos,
        }
    }

    /// Returns the current time as nanoseconds since the start of the run.
    pub fn now_nanos(&self) -> u64 {
        self.current_nanos
    }

    /// Returns the current time as a Duration since the start of the run.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.current_nanos)
    }

    /// Advances time by the given duration and returns the new time.
    pub fn advance(&mut self, duration: Duration) -> u64 {
        let target = self.current_nanos.saturating_add(as_nanos(duration));
        self.advance_to(target)
    }

    /// Advances time to the given absolute nanoseconds.
    ///
    /// Targets in the past leave the clock untouched. Returns the current time
    /// after the call.
    pub fn advance_to(&mut self, target_nanos: u64) -> u64 {
        if target_nanos > self.current_nanos {
            self.current_nanos = target_nanos;
        }
        self.current_nanos
    }
}

/// Converts a duration to whole nanoseconds, saturating at `u64::MAX`.
pub(crate) fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
