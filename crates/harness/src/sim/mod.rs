//! Simulation driving.
//!
//! 1. **Core:** The `SimCore` trait implemented by instruction-level simulators, and a registry of variants.
//! 2. **Context:** The per-session object owning the clock, signal graph, timers, and statistics.
//! 3. **Loader:** Firmware image classification and validation.
//! 4. **Session:** A core paired with its context; stepping, signal lookup, and lifecycle.

/// Per-session context.
pub mod context;

/// Simulation core trait and registry.
pub mod core;

/// Firmware image intake.
pub mod loader;

/// Simulation session.
pub mod session;

pub use self::context::SimContext;
pub use self::core::{CoreFactory, CoreRegistry, SimCore};
pub use self::loader::{FirmwareFormat, FirmwareImage, load_firmware};
pub use self::session::Session;
