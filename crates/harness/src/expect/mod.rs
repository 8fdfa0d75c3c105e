//! IRQ expectations.
//!
//! 1. **Problems:** Structured reasons a window failed.
//! 2. **Engine:** Event capture and windowed matching with stop policies.
//! 3. **Bench:** A session and an engine packaged for writing firmware tests.

/// Test bench.
pub mod bench;

/// Expectation engine.
pub mod engine;

/// Expectation failures.
pub mod problem;

pub use bench::{Bench, WatchMode};
pub use engine::{Event, ExpectEngine, Expectation, StopPolicy, WindowReport};
pub use problem::{ExpectError, Problem};
