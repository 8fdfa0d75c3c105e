//! Session statistics collection and reporting.
//!
//! This module tracks what a session did while it ran. It provides:
//! 1. **Progress:** Core steps taken and cycles simulated.
//! 2. **Signals:** Raises (propagated ones included) and subscriber notifications.
//! 3. **Timers:** Scheduled, fired, and cancelled counts.
//!
//! [`SimStats`] renders a fixed-width report through `Display`.

use std::fmt;
use std::time::{Duration, Instant};

/// Counters accumulated over the lifetime of a session.
#[derive(Debug, Clone)]
pub struct SimStats {
    start_time: Instant,
    /// Core steps executed.
    pub steps: u64,
    /// Cycles simulated.
    pub cycles: u64,
    /// Signal raises, including those reached through propagation edges.
    pub raises: u64,
    /// Subscriber callbacks invoked.
    pub notifications: u64,
    /// Timers scheduled.
    pub timers_scheduled: u64,
    /// Timer callbacks invoked.
    pub timers_fired: u64,
    /// Timers cancelled before retiring.
    pub timers_cancelled: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            steps: 0,
            cycles: 0,
            raises: 0,
            notifications: 0,
            timers_scheduled: 0,
            timers_fired: 0,
            timers_cancelled: 0,
        }
    }
}

impl SimStats {
    /// Host time elapsed since the statistics were created.
    pub fn host_time(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average cycles per core step; zero before the first step.
    #[allow(clippy::cast_precision_loss)]
    pub fn cycles_per_step(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.cycles as f64 / self.steps as f64
    }
}

impl fmt::Display for SimStats {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.host_time().as_secs_f64();
        let khz = if seconds > 0.0 {
            (self.cycles as f64 / seconds) / 1000.0
        } else {
            0.0
        };
        writeln!(f, "==========================================================")?;
        writeln!(f, "SIMULATION HARNESS STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "host_seconds             {seconds:.4} s")?;
        writeln!(f, "sim_steps                {}", self.steps)?;
        writeln!(f, "sim_cycles               {}", self.cycles)?;
        writeln!(f, "sim_freq                 {khz:.2} kHz")?;
        writeln!(f, "cycles_per_step          {:.2}", self.cycles_per_step())?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "SIGNALS")?;
        writeln!(f, "  irq.raises             {}", self.raises)?;
        writeln!(f, "  irq.notifications      {}", self.notifications)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "TIMERS")?;
        writeln!(f, "  timer.scheduled        {}", self.timers_scheduled)?;
        writeln!(f, "  timer.fired            {}", self.timers_fired)?;
        writeln!(f, "  timer.cancelled        {}", self.timers_cancelled)?;
        write!(f, "==========================================================")
    }
}
