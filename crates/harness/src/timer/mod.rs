//! Cycle timers.
//!
//! Timers fire when the session clock reaches their absolute target cycle. The
//! [`Scheduler`] owns every live timer; callers only hold a copyable [`TimerId`].

/// Timer queue and ownership.
pub mod scheduler;

pub use scheduler::{Scheduler, TimerFn, TimerId};
