//! Host-side test harness for cycle-accurate hardware simulators.
//!
//! This crate sits between a simulation core (which executes firmware and owns the
//! cycle counter) and the tests that make assertions about what the firmware does:
//! 1. **IRQ graph:** Named signals, propagation edges, and deduplicated change subscribers.
//! 2. **Timers:** Cycle-indexed callbacks with rescheduling and idempotent cancellation.
//! 3. **Simulation:** The `SimCore` trait, the per-session context, firmware intake, and sessions.
//! 4. **Expectations:** Windowed matching of captured IRQ changes against declared expectations.
//! 5. **Tracing:** Passive value-change-dump recording of selected signals.

/// Common types (clock, errors).
pub mod common;
/// Session configuration (frequency, variant, firmware, trace output).
pub mod config;
/// Windowed IRQ expectation engine and the test bench built on it.
pub mod expect;
/// Signal graph: IRQ nodes, edges, subscribers, and handles.
pub mod irq;
/// Simulation core trait, context, firmware loader, and session.
pub mod sim;
/// Session statistics collection and reporting.
pub mod stats;
/// Cycle timer scheduler.
pub mod timer;
/// Value-change trace sinks.
pub mod trace;

/// Root configuration type; use `Config::default()` or load from JSON.
pub use crate::config::Config;
/// Test bench: a session plus an expectation engine.
pub use crate::expect::{Bench, Expectation, StopPolicy, WatchMode};
/// Signal handles.
pub use crate::irq::{CoreIrq, IrqId, IrqValue, OwnedIrq};
/// Simulation entry points.
pub use crate::sim::{Session, SimContext, SimCore};
