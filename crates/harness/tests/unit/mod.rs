//! # Unit Components
//!
//! Tests grouped by harness component, from the signal graph up to the
//! firmware-level scenarios run through the test bench.


/// Configuration loading and defaults.
pub mod config;
