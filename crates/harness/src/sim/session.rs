//! Simulation session.
//!
//! A [`Session`] pairs one simulation core with the [`SimContext`] it drives. It is
//! responsible for:
//! 1. **Setup:** Resolving the variant and frequency, and loading firmware before any cycle runs.
//! 2. **Stepping:** Running the core, checking it moved the clock, and firing due timers.
//! 3. **Signals:** Resolving hardware addresses to graph nodes with stable default names.
//! 4. **Teardown:** Reset and termination with final statistics.

use std::fmt;

use super::context::SimContext;
use super::core::{CoreRegistry, SimCore};
use super::loader::{self, FirmwareImage};
use crate::common::{ConfigError, SimError};
use crate::config::Config;
use crate::irq::{
    CallbackArg, CallbackId, CoreIrq, IntoIrqValue, IrqId, IrqSource, IrqValue, OwnedIrq,
};
use crate::stats::SimStats;
use crate::timer::TimerId;

/// One simulation core and its context.
pub struct Session {
    core: Box<dyn SimCore>,
    ctx: SimContext,
    config: Config,
    firmware: Option<FirmwareImage>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("core", &self.core.name())
            .field("ctx", &self.ctx)
            .field("firmware", &self.firmware.as_ref().map(|fw| &fw.path))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds a session around `core`.
    ///
    /// The frequency is `config.frequency` if set, otherwise the core's own. A configured
    /// firmware image is validated and handed to the core before returning.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingFrequency`] / [`ConfigError::ZeroFrequency`] for a bad clock.
    /// * Any firmware error from [`loader::load_firmware`] or the core.
    pub fn new(mut core: Box<dyn SimCore>, config: Config) -> Result<Self, SimError> {
        let frequency = config
            .frequency
            .or_else(|| core.frequency())
            .ok_or(ConfigError::MissingFrequency)?;
        if frequency == 0 {
            return Err(ConfigError::ZeroFrequency.into());
        }

        let firmware = match &config.firmware {
            Some(path) => {
                let image = loader::load_firmware(path)?;
                core.load_firmware(&image)?;
                Some(image)
            }
            None => None,
        };

        let ctx = SimContext::new(frequency, &config.general);
        tracing::debug!(core = core.name(), frequency, session = ?ctx.session(), "session created");
        Ok(Self {
            core,
            ctx,
            config,
            firmware,
        })
    }

    /// Builds a session for the variant named by `config.mcu`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVariant`] if no variant is configured,
    /// [`ConfigError::UnknownVariant`] if the registry does not know it, plus every
    /// error of [`Self::new`].
    pub fn from_config(config: Config, registry: &CoreRegistry) -> Result<Self, SimError> {
        let mcu = config.mcu.as_deref().ok_or(ConfigError::MissingVariant)?;
        let core = registry.create(mcu)?;
        Self::new(core, config)
    }

    /// Name of the core variant.
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Configuration the session was built with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Validated firmware image, if one was configured.
    pub const fn firmware(&self) -> Option<&FirmwareImage> {
        self.firmware.as_ref()
    }

    /// Session context.
    pub const fn ctx(&self) -> &SimContext {
        &self.ctx
    }

    /// Mutable session context.
    pub const fn ctx_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    /// Current cycle.
    #[inline]
    pub const fn now(&self) -> u64 {
        self.ctx.now()
    }

    /// Clock frequency in Hz.
    pub const fn frequency(&self) -> u32 {
        self.ctx.clock().frequency()
    }

    /// Statistics collected so far.
    pub const fn stats(&self) -> &SimStats {
        self.ctx.stats()
    }

    /// Runs one core step, then fires every timer that became due.
    ///
    /// # Errors
    ///
    /// [`SimError::CoreStalled`] if the step did not move the clock, or the core's own error.
    pub fn advance(&mut self) -> Result<(), SimError> {
        let before = self.ctx.now();
        self.core.step(&mut self.ctx)?;
        let after = self.ctx.now();
        if after <= before {
            tracing::warn!(core = self.core.name(), cycle = before, "core did not advance");
            return Err(SimError::CoreStalled {
                core: self.core.name().to_owned(),
                cycle: before,
            });
        }
        let stats = self.ctx.stats_mut();
        stats.steps += 1;
        stats.cycles += after - before;
        let _ = self.ctx.run_due_timers();
        Ok(())
    }

    /// Steps the core until the clock reaches `end_cycle`. The last step may overshoot.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::advance`].
    pub fn run_until(&mut self, end_cycle: u64) -> Result<(), SimError> {
        while self.ctx.now() < end_cycle {
            self.advance()?;
        }
        Ok(())
    }

    /// Runs for `cycles` cycles.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::advance`].
    pub fn run_cycles(&mut self, cycles: u64) -> Result<(), SimError> {
        let end = self.ctx.now().saturating_add(cycles);
        self.run_until(end)
    }

    /// Runs for `usecs` microseconds of simulated time.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::advance`].
    pub fn run_us(&mut self, usecs: u64) -> Result<(), SimError> {
        self.run_cycles(self.usec_to_cycles(usecs))
    }

    /// Resets the core. Pending timers are dropped; signal values and the clock are kept.
    pub fn reset(&mut self) {
        self.ctx.cancel_all_timers();
        self.core.reset(&mut self.ctx);
        tracing::debug!(core = self.core.name(), cycle = self.ctx.now(), "session reset");
    }

    /// Ends the session and returns its statistics.
    pub fn terminate(self) -> SimStats {
        tracing::debug!(core = self.core.name(), cycle = self.ctx.now(), "session terminated");
        self.ctx.stats().clone()
    }

    /// Converts microseconds to cycles at the session frequency.
    pub fn usec_to_cycles(&self, usecs: u64) -> u64 {
        self.ctx.clock().usec_to_cycles(usecs)
    }

    /// Converts cycles to microseconds at the session frequency.
    pub fn cycles_to_usec(&self, cycles: u64) -> u64 {
        self.ctx.clock().cycles_to_usec(cycles)
    }

    /// Cycles per period of a signal at `hz`.
    pub fn hz_to_cycles(&self, hz: u32) -> u64 {
        self.ctx.clock().hz_to_cycles(hz)
    }

    /// See [`SimContext::add_timer`].
    ///
    /// # Errors
    ///
    /// [`SimError::ZeroDelay`] if `cycles` is zero.
    pub fn add_timer<F>(
        &mut self,
        cycles: u64,
        callback: F,
        arg: impl Into<CallbackArg>,
    ) -> Result<TimerId, SimError>
    where
        F: FnMut(&mut SimContext, &CallbackArg) -> Option<u64> + 'static,
    {
        self.ctx.add_timer(cycles, callback, arg)
    }

    /// See [`SimContext::add_timer_us`].
    ///
    /// # Errors
    ///
    /// [`SimError::ZeroDelay`] if `usecs` is shorter than one cycle.
    pub fn add_timer_us<F>(
        &mut self,
        usecs: u64,
        callback: F,
        arg: impl Into<CallbackArg>,
    ) -> Result<TimerId, SimError>
    where
        F: FnMut(&mut SimContext, &CallbackArg) -> Option<u64> + 'static,
    {
        self.ctx.add_timer_us(usecs, callback, arg)
    }

    /// See [`SimContext::reschedule_timer`].
    pub fn reschedule_timer(&mut self, id: TimerId, cycles: u64) -> bool {
        self.ctx.reschedule_timer(id, cycles)
    }

    /// See [`SimContext::cancel_timer`].
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.ctx.cancel_timer(id)
    }

    /// Looks up a core signal, renaming it to `name` if given. A signal seen for the
    /// first time is otherwise named `ctl<ctl>-<index>`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such signal.
    pub fn get_io_irq(
        &mut self,
        ctl: u32,
        index: u32,
        name: Option<&str>,
    ) -> Result<CoreIrq, SimError> {
        self.lookup_irq(IrqSource::Io { ctl, index }, name)
    }

    /// Looks up an I/O port pin, renaming it to `name` if given. A pin seen for the
    /// first time is otherwise named `ioport_<L><index>`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such pin.
    pub fn get_ioport_irq(
        &mut self,
        letter: char,
        index: u8,
        name: Option<&str>,
    ) -> Result<CoreIrq, SimError> {
        self.lookup_irq(IrqSource::port(letter, index), name)
    }

    /// Looks up an I/O register bit, renaming it to `name` if given. A bit seen for the
    /// first time is otherwise named `iomem_0x<reg>_<bit>`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such register bit.
    pub fn get_iomem_irq(
        &mut self,
        register: u16,
        bit: u8,
        name: Option<&str>,
    ) -> Result<CoreIrq, SimError> {
        self.lookup_irq(IrqSource::IoMem { register, bit }, name)
    }

    fn lookup_irq(&mut self, source: IrqSource, name: Option<&str>) -> Result<CoreIrq, SimError> {
        let handle = self.core.irq(source).ok_or(SimError::UnknownIrq(source))?;
        let default_name = source.default_name();
        let irq = self.ctx.core_irq(handle, name.unwrap_or(&default_name));
        if let Some(name) = name {
            self.ctx.graph_mut().set_name(irq.id(), name);
        } else if self.ctx.name(irq) == SimContext::placeholder_name(handle) {
            self.ctx.graph_mut().set_name(irq.id(), &default_name);
        }
        Ok(irq)
    }

    /// See [`SimContext::alloc_irq`].
    pub fn alloc_irq(&mut self, name: &str) -> OwnedIrq {
        self.ctx.alloc_irq(name)
    }

    /// See [`SimContext::release_irq`].
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `irq` belongs to another session.
    pub fn release_irq(&mut self, irq: OwnedIrq) -> Result<(), SimError> {
        self.ctx.release_irq(irq)
    }

    /// See [`SimContext::raise`].
    pub fn raise(&mut self, irq: impl Into<IrqId>, value: impl IntoIrqValue) {
        self.ctx.raise(irq, value);
    }

    /// See [`SimContext::connect`].
    pub fn connect(&mut self, source: impl Into<IrqId>, destination: impl Into<IrqId>) {
        self.ctx.connect(source, destination);
    }

    /// See [`SimContext::value`].
    pub fn value(&self, irq: impl Into<IrqId>) -> IrqValue {
        self.ctx.value(irq)
    }

    /// See [`SimContext::on_change`].
    pub fn on_change<F>(&mut self, irq: impl Into<IrqId>, callback: F) -> CallbackId
    where
        F: Fn(&mut SimContext, IrqValue) + 'static,
    {
        self.ctx.on_change(irq, callback)
    }

    /// See [`SimContext::info`].
    pub fn info(&mut self, message: impl fmt::Display) {
        self.ctx.info(message);
    }
}
