//! Test bench: a session paired with an expectation engine.
//!
//! [`Bench`] is what firmware tests are written against. Signals are registered with a
//! [`WatchMode`], then windows are run with `expect_for_*` calls:
//!
//! ```ignore
//! let pin = bench.register_ioport_irq('B', 0, Some("PIN"), WatchMode::default())?;
//! let led = bench.register_ioport_irq('B', 3, Some("LED"), WatchMode::default())?;
//! bench.expect_for_cycles(1000, [(pin, 1), (led, 1)], StopPolicy::None)?;
//! ```

use super::engine::{Event, ExpectEngine, Expectation, StopPolicy, WindowReport};
use super::problem::ExpectError;
use crate::common::SimError;
use crate::irq::{CoreIrq, IntoIrqValue, IrqId};
use crate::sim::Session;

/// How a registered signal takes part in expectation windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    /// Matched against expectations.
    Match,
    /// Matched and logged on every change.
    #[default]
    MatchAndDisplay,
    /// Logged on every change but never matched.
    DisplayOnly,
}

/// A session under test plus its expectation engine.
#[derive(Debug)]
pub struct Bench {
    session: Session,
    engine: ExpectEngine,
}

impl Bench {
    /// Wraps `session`.
    pub fn new(mut session: Session) -> Self {
        let engine = ExpectEngine::new(session.ctx_mut());
        Self { session, engine }
    }

    /// Session under test.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session under test.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Expectation engine.
    pub const fn engine(&self) -> &ExpectEngine {
        &self.engine
    }

    /// Gives the session back.
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Monitors every signal in `irqs`.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if the engine is bound to another session.
    pub fn monitor<I: Into<IrqId>>(
        &mut self,
        irqs: impl IntoIterator<Item = I>,
    ) -> Result<(), SimError> {
        for irq in irqs {
            self.engine.monitor(self.session.ctx_mut(), irq)?;
        }
        Ok(())
    }

    /// Excludes every signal in `irqs` from matching.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if a signal belongs to another session.
    pub fn ignore<I: Into<IrqId>>(
        &mut self,
        irqs: impl IntoIterator<Item = I>,
    ) -> Result<(), SimError> {
        for irq in irqs {
            self.engine.ignore(irq)?;
        }
        Ok(())
    }

    /// Logs every change of the signals in `irqs`.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if a signal belongs to another session.
    pub fn display<I: Into<IrqId>>(
        &mut self,
        irqs: impl IntoIterator<Item = I>,
    ) -> Result<(), SimError> {
        for irq in irqs {
            self.engine.display(irq)?;
        }
        Ok(())
    }

    /// Monitors `irq` and configures it according to `mode`.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `irq` belongs to another session.
    pub fn register_irq(&mut self, irq: impl Into<IrqId>, mode: WatchMode) -> Result<(), SimError> {
        let irq = irq.into();
        self.engine.monitor(self.session.ctx_mut(), irq)?;
        match mode {
            WatchMode::Match => Ok(()),
            WatchMode::MatchAndDisplay => self.engine.display(irq),
            WatchMode::DisplayOnly => {
                self.engine.ignore(irq)?;
                self.engine.display(irq)
            }
        }
    }

    /// Looks up a peripheral signal and registers it.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such signal.
    pub fn register_io_irq(
        &mut self,
        ctl: u32,
        index: u32,
        name: Option<&str>,
        mode: WatchMode,
    ) -> Result<CoreIrq, SimError> {
        let irq = self.session.get_io_irq(ctl, index, name)?;
        self.register_irq(irq, mode)?;
        Ok(irq)
    }

    /// Looks up a port pin and registers it.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such pin.
    pub fn register_ioport_irq(
        &mut self,
        letter: char,
        index: u8,
        name: Option<&str>,
        mode: WatchMode,
    ) -> Result<CoreIrq, SimError> {
        let irq = self.session.get_ioport_irq(letter, index, name)?;
        self.register_irq(irq, mode)?;
        Ok(irq)
    }

    /// Looks up a register bit and registers it.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such register bit.
    pub fn register_iomem_irq(
        &mut self,
        register: u16,
        bit: u8,
        name: Option<&str>,
        mode: WatchMode,
    ) -> Result<CoreIrq, SimError> {
        let irq = self.session.get_iomem_irq(register, bit, name)?;
        self.register_irq(irq, mode)?;
        Ok(irq)
    }

    /// Raises `irq` on the session; a monitored signal is captured at the current cycle.
    pub fn raise(&mut self, irq: impl Into<IrqId>, value: impl IntoIrqValue) {
        self.session.raise(irq, value);
    }

    /// Runs up to `cycles` cycles expecting exactly `expectations`.
    ///
    /// # Errors
    ///
    /// See [`ExpectEngine::expect_for_cycles`].
    pub fn expect_for_cycles(
        &mut self,
        cycles: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        self.engine
            .expect_for_cycles(&mut self.session, cycles, expectations, stop)
    }

    /// Runs up to `usecs` microseconds expecting exactly `expectations`.
    ///
    /// # Errors
    ///
    /// See [`ExpectEngine::expect_for_cycles`].
    pub fn expect_for_us(
        &mut self,
        usecs: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        self.engine
            .expect_for_us(&mut self.session, usecs, expectations, stop)
    }

    /// Runs up to `msecs` milliseconds expecting exactly `expectations`.
    ///
    /// # Errors
    ///
    /// See [`ExpectEngine::expect_for_cycles`].
    pub fn expect_for_ms(
        &mut self,
        msecs: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        self.engine
            .expect_for_ms(&mut self.session, msecs, expectations, stop)
    }

    /// Runs `cycles` cycles during which no matched signal may change.
    ///
    /// # Errors
    ///
    /// [`ExpectError::Failed`] on the first unexpected change.
    pub fn expect_silence_for_cycles(&mut self, cycles: u64) -> Result<WindowReport, ExpectError> {
        self.expect_for_cycles(cycles, Vec::<Expectation>::new(), StopPolicy::None)
    }

    /// Runs `usecs` microseconds during which no matched signal may change.
    ///
    /// # Errors
    ///
    /// [`ExpectError::Failed`] on the first unexpected change.
    pub fn expect_silence_for_us(&mut self, usecs: u64) -> Result<WindowReport, ExpectError> {
        self.expect_for_us(usecs, Vec::<Expectation>::new(), StopPolicy::None)
    }

    /// Runs `msecs` milliseconds during which no matched signal may change.
    ///
    /// # Errors
    ///
    /// [`ExpectError::Failed`] on the first unexpected change.
    pub fn expect_silence_for_ms(&mut self, msecs: u64) -> Result<WindowReport, ExpectError> {
        self.expect_for_ms(msecs, Vec::<Expectation>::new(), StopPolicy::None)
    }

    /// Runs `cycles` cycles displaying changes without capturing them for matching.
    ///
    /// # Errors
    ///
    /// Any session error while stepping.
    pub fn observe_for_cycles(&mut self, cycles: u64) -> Result<(), SimError> {
        self.engine.set_capturing(false);
        let result = self.session.run_cycles(cycles);
        self.engine.set_capturing(true);
        result
    }

    /// Events captured but not yet consumed by a window.
    pub fn queued_events(&self) -> Vec<Event> {
        self.engine.queued()
    }

    /// Clears the monitor sets and the event queue.
    pub fn reset_expectations(&mut self) {
        self.engine.reset();
    }
}
