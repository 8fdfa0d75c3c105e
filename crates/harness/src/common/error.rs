//! Error types for session setup and simulation.
//!
//! Two layers of errors exist:
//! 1. **Configuration errors:** Anything that must stop a session before the first cycle
//!    runs (missing variant or frequency, unreadable or malformed firmware, bad JSON).
//! 2. **Simulation errors:** Caller-contract violations detected at runtime and failures
//!    reported by the simulation core itself.
//!
//! Expectation failures are not errors of this module; see [`crate::expect::ExpectError`].

use std::io;
use std::path::PathBuf;

use crate::irq::IrqSource;

/// Errors that prevent a session from being constructed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No hardware variant was configured.
    #[error("mcu is not defined")]
    MissingVariant,

    /// The configured hardware variant is not known to the core registry.
    #[error("mcu '{0}' is not known")]
    UnknownVariant(String),

    /// Neither the configuration nor the core supplies a clock frequency.
    #[error("frequency is not defined")]
    MissingFrequency,

    /// The configured frequency is zero.
    #[error("frequency must be non-zero")]
    ZeroFrequency,

    /// The firmware file could not be read.
    #[error("unable to read firmware '{}': {source}", path.display())]
    FirmwareRead {
        /// Path of the firmware image.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The firmware file was read but its contents are invalid.
    #[error("malformed firmware '{}': {reason}", path.display())]
    MalformedFirmware {
        /// Path of the firmware image.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The firmware file is neither Intel HEX nor ELF.
    #[error("unsupported firmware format: '{}'", path.display())]
    UnsupportedFirmware {
        /// Path of the firmware image.
        path: PathBuf,
    },

    /// A configuration file could not be read.
    #[error("unable to read config '{}': {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration JSON is invalid.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while a session is running.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Session construction failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A timer was scheduled with a zero delay.
    #[error("timer delay must be at least one cycle")]
    ZeroDelay,

    /// The core has no signal for the requested source.
    #[error("core has no irq for {0}")]
    UnknownIrq(IrqSource),

    /// A handle from a different session was passed to this one.
    #[error("irq handle belongs to another session")]
    ForeignIrq,

    /// An expectation names a signal the engine does not monitor.
    #[error("irq '{name}' is not monitored")]
    NotMonitored {
        /// Name of the offending signal.
        name: String,
    },

    /// A core step returned without advancing the clock.
    #[error("core '{core}' did not advance past cycle {cycle}")]
    CoreStalled {
        /// Core name.
        core: String,
        /// Cycle at which the step was attempted.
        cycle: u64,
    },

    /// The simulation core reported a failure.
    #[error("core failure: {0}")]
    Core(String),

    /// A trace sink failed to write.
    #[error("trace I/O error: {0}")]
    Trace(#[from] io::Error),
}
