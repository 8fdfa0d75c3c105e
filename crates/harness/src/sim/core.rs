//! Simulation core trait and registry.
//!
//! This module defines the seam between the harness and the instruction-level simulator. It provides:
//! 1. **Identification:** `name` and an optional native clock `frequency`.
//! 2. **Execution:** `step` runs the core's minimal indivisible unit of work and moves the clock.
//! 3. **Signals:** `irq` resolves a hardware address to the core's own signal handle.
//! 4. **Lifecycle:** Optional firmware intake and reset hooks.
//!
//! The [`CoreRegistry`] maps hardware variant names to core constructors so a session
//! can be built from configuration alone.

use std::collections::BTreeMap;
use std::fmt;

use super::context::SimContext;
use super::loader::FirmwareImage;
use crate::common::{ConfigError, SimError};
use crate::irq::{ExternalIrq, IrqSource};

/// Instruction-level simulator driven by a session.
///
/// A core advances simulated time through [`SimContext::advance_clock`] and reports
/// hardware state changes by raising signals on the context. Due timers are fired by
/// the session after every step.
pub trait SimCore {
    /// Returns the hardware variant name (e.g., `"attiny85"`).
    fn name(&self) -> &str;

    /// Native clock frequency in Hz, if the variant defines one.
    fn frequency(&self) -> Option<u32> {
        None
    }

    /// Accepts a validated firmware image before the first cycle runs.
    ///
    /// # Errors
    ///
    /// Implementations return [`SimError::Core`] if the image does not fit the variant.
    fn load_firmware(&mut self, image: &FirmwareImage) -> Result<(), SimError> {
        let _ = image;
        Ok(())
    }

    /// Executes one minimal step. Must advance the clock by at least one cycle.
    ///
    /// # Errors
    ///
    /// Failures of the core's own domain, reported as [`SimError::Core`].
    fn step(&mut self, ctx: &mut SimContext) -> Result<(), SimError>;

    /// Resolves a hardware signal address to the core's handle.
    fn irq(&mut self, source: IrqSource) -> Option<ExternalIrq>;

    /// Returns the core to its power-on state.
    fn reset(&mut self, ctx: &mut SimContext) {
        let _ = ctx;
    }
}

/// Constructor for one hardware variant.
pub type CoreFactory = dyn Fn() -> Box<dyn SimCore>;

/// Named core constructors.
#[derive(Default)]
pub struct CoreRegistry {
    factories: BTreeMap<String, Box<CoreFactory>>,
}

impl fmt::Debug for CoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRegistry")
            .field("variants", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CoreRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn SimCore> + 'static,
    {
        let _ = self.factories.insert(name.into(), Box::new(factory));
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered variant names, sorted.
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds a core for `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownVariant`] if no factory is registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn SimCore>, ConfigError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownVariant(name.to_owned()))
    }
}
