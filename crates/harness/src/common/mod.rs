//! Common types shared by every component of the harness.
//!
//! 1. **Clock:** The session's monotonic cycle counter and its frequency conversions.
//! 2. **Errors:** Configuration and runtime error enums.

/// Cycle counter and time conversions.
pub mod clock;

/// Error types.
pub mod error;

pub use clock::{Clock, NSEC_PER_SEC, USEC_PER_SEC};
pub use error::{ConfigError, SimError};
