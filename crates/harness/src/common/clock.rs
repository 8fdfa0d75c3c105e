//! Session clock.
//!
//! The simulation core owns simulated time; the harness mirrors it in a [`Clock`]
//! that only moves forward. All conversions between cycles and wall-clock units go
//! through the clock so they agree with the frequency the session was built with.

/// Microseconds per second.
pub const USEC_PER_SEC: u64 = 1_000_000;

/// Nanoseconds per second.
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Monotonic cycle counter paired with the simulated clock frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    cycle: u64,
    frequency: u32,
}

impl Clock {
    /// Creates a clock at cycle zero.
    ///
    /// # Arguments
    ///
    /// * `frequency` - Core clock in Hz; must be non-zero (checked by the session).
    pub const fn new(frequency: u32) -> Self {
        Self {
            cycle: 0,
            frequency,
        }
    }

    /// Current cycle.
    #[inline]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Clock frequency in Hz.
    #[inline]
    pub const fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Moves the clock forward by `cycles`.
    #[inline]
    pub const fn advance(&mut self, cycles: u64) {
        self.cycle = self.cycle.saturating_add(cycles);
    }

    /// Converts microseconds to cycles at the current frequency (truncating).
    pub fn usec_to_cycles(&self, usecs: u64) -> u64 {
        scale(usecs, u64::from(self.frequency), USEC_PER_SEC)
    }

    /// Converts cycles back to microseconds (truncating).
    pub fn cycles_to_usec(&self, cycles: u64) -> u64 {
        scale(cycles, USEC_PER_SEC, u64::from(self.frequency))
    }

    /// Converts cycles to nanoseconds (truncating).
    pub fn cycles_to_nsec(&self, cycles: u64) -> u64 {
        scale(cycles, NSEC_PER_SEC, u64::from(self.frequency))
    }

    /// Number of cycles in one period of a signal at `hz`.
    pub fn hz_to_cycles(&self, hz: u32) -> u64 {
        if hz == 0 {
            return 0;
        }
        u64::from(self.frequency / hz)
    }
}

/// `value * mul / div` without intermediate overflow, saturating at `u64::MAX`.
fn scale(value: u64, mul: u64, div: u64) -> u64 {
    if div == 0 {
        return 0;
    }
    let wide = u128::from(value) * u128::from(mul) / u128::from(div);
    u64::try_from(wide).unwrap_or(u64::MAX)
}
