//! Session configuration.
//!
//! This module defines the configuration consumed when a session is built. It provides:
//! 1. **Defaults:** Baseline values for tracing and logging options.
//! 2. **Structures:** Top-level hardware selection plus general and trace sections.
//! 3. **Loading:** JSON parsing from a string or a file.
//!
//! Every field except the hardware selection has a default, so `{"mcu": "attiny85"}`
//! is a complete configuration when the core knows its own clock.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::ConfigError;

/// Default configuration constants.
mod defaults {
    /// Cycles between two flushes of a trace sink.
    pub const TRACE_FLUSH_PERIOD: u64 = 100_000;
}

/// Session configuration.
///
/// # Examples
///
/// ```
/// use simharness::Config;
///
/// let json = r#"{
///     "mcu": "attiny85",
///     "frequency": 8000000,
///     "general": { "trace_irqs": true },
///     "trace": { "path": "out.vcd" }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.mcu.as_deref(), Some("attiny85"));
/// assert_eq!(config.frequency, Some(8_000_000));
/// assert!(config.general.trace_irqs);
/// assert_eq!(config.trace.flush_period, 100_000);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Hardware variant resolved through the core registry.
    #[serde(default)]
    pub mcu: Option<String>,

    /// Clock frequency in Hz; overrides the core's own when set.
    #[serde(default)]
    pub frequency: Option<u32>,

    /// Firmware image loaded before the first cycle.
    #[serde(default)]
    pub firmware: Option<PathBuf>,

    /// General options.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Trace output options.
    #[serde(default)]
    pub trace: TraceConfig,
}

impl Config {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, [`ConfigError::Parse`] if it is
    /// not a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Sets the hardware variant.
    #[must_use]
    pub fn with_mcu(mut self, mcu: impl Into<String>) -> Self {
        self.mcu = Some(mcu.into());
        self
    }

    /// Sets the clock frequency override.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Sets the firmware image path.
    #[must_use]
    pub fn with_firmware(mut self, path: impl Into<PathBuf>) -> Self {
        self.firmware = Some(path.into());
        self
    }
}

/// General session options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Suppress cycle-stamped info messages.
    #[serde(default)]
    pub quiet: bool,

    /// Log every signal raise at `debug` level instead of `trace`.
    #[serde(default)]
    pub trace_irqs: bool,
}

/// Trace (value change dump) output options.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceConfig {
    /// Output file; no trace is written when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Cycles between two flushes of the sink.
    #[serde(default = "TraceConfig::default_flush_period")]
    pub flush_period: u64,
}

impl TraceConfig {
    /// Returns the default flush period.
    const fn default_flush_period() -> u64 {
        defaults::TRACE_FLUSH_PERIOD
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_period: defaults::TRACE_FLUSH_PERIOD,
        }
    }
}
