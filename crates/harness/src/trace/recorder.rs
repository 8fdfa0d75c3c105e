//! Trace recorder.
//!
//! A [`Trace`] subscribes one callback to every traced signal. Between [`Trace::start`]
//! and [`Trace::stop`] each raise is forwarded to the sink with a nanosecond timestamp,
//! and the sink is flushed every `flush_period` cycles. Sink errors raised inside
//! callbacks cannot be returned to the raiser; the first one is kept and recording
//! stops until [`Trace::stop`] reports it.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use super::{TraceSink, VcdSink};
use crate::common::{Clock, SimError};
use crate::config::TraceConfig;
use crate::irq::{CallbackArg, CallbackId, IrqId, IrqValue};
use crate::sim::{Session, SimContext};

struct TraceState {
    sink: Box<dyn TraceSink>,
    signals: Vec<IrqId>,
    running: bool,
    flush_period: u64,
    last_flush: u64,
    error: Option<io::Error>,
}

impl TraceState {
    fn record(&mut self, clock: &Clock, index: usize, value: IrqValue) {
        if !self.running || self.error.is_some() {
            return;
        }
        let cycle = clock.cycle();
        let result = self
            .sink
            .record(clock.cycles_to_nsec(cycle), index, value)
            .and_then(|()| {
                if cycle.saturating_sub(self.last_flush) >= self.flush_period {
                    self.last_flush = cycle;
                    self.sink.flush()
                } else {
                    Ok(())
                }
            });
        if let Err(e) = result {
            tracing::warn!(cycle, error = %e, "trace sink failed; recording suspended");
            self.error = Some(e);
        }
    }
}

/// Passive recorder of signal values.
pub struct Trace {
    callback: CallbackId,
    state: Rc<RefCell<TraceState>>,
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Trace")
            .field("callback", &self.callback)
            .field("signals", &state.signals)
            .field("running", &state.running)
            .field("flush_period", &state.flush_period)
            .finish_non_exhaustive()
    }
}

impl Trace {
    /// Creates a recorder writing to `sink`, flushing every `flush_period` cycles.
    pub fn new(ctx: &mut SimContext, sink: Box<dyn TraceSink>, flush_period: u64) -> Self {
        let state = Rc::new(RefCell::new(TraceState {
            sink,
            signals: Vec::new(),
            running: false,
            flush_period,
            last_flush: ctx.now(),
            error: None,
        }));
        let shared = Rc::clone(&state);
        let callback = ctx.register_callback(move |ctx, value, arg| {
            let CallbackArg::Int(index) = *arg else {
                return;
            };
            if let Ok(index) = usize::try_from(index) {
                shared.borrow_mut().record(ctx.clock(), index, value);
            }
        });
        Self { callback, state }
    }

    /// Creates a VCD recorder for the file configured in `config`, if any.
    ///
    /// # Errors
    ///
    /// [`SimError::Trace`] if the file cannot be created.
    pub fn from_config(
        ctx: &mut SimContext,
        config: &TraceConfig,
    ) -> Result<Option<Self>, SimError> {
        let Some(path) = &config.path else {
            return Ok(None);
        };
        let sink = VcdSink::create(path)?;
        tracing::debug!(path = %path.display(), "trace file created");
        Ok(Some(Self::new(ctx, Box::new(sink), config.flush_period)))
    }

    /// Traces `irq` as a `width`-bit signal called `name`.
    ///
    /// # Errors
    ///
    /// * [`SimError::ForeignIrq`] if `irq` belongs to another session than `ctx`.
    /// * [`SimError::Trace`] if the sink refuses the declaration (for example after start).
    pub fn add_signal(
        &mut self,
        ctx: &mut SimContext,
        irq: impl Into<IrqId>,
        width: u32,
        name: &str,
    ) -> Result<(), SimError> {
        let irq = irq.into();
        if !ctx.owns(irq) {
            return Err(SimError::ForeignIrq);
        }
        let index = {
            let mut state = self.state.borrow_mut();
            let index = state.sink.declare(name, width)?;
            state.signals.push(irq);
            index
        };
        let arg = CallbackArg::Int(i64::try_from(index).unwrap_or(i64::MAX));
        let _ = ctx.subscribe(irq, self.callback, arg);
        Ok(())
    }

    /// Traces pin `index` of port `letter`, labelled `<letter>-<index>` in the dump.
    ///
    /// The signal keeps whatever name the session already gave it.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownIrq`] if the core has no such pin, or any error of
    /// [`Self::add_signal`].
    pub fn add_ioport_signal(
        &mut self,
        session: &mut Session,
        letter: char,
        index: u8,
        width: u32,
    ) -> Result<(), SimError> {
        let irq = session.get_ioport_irq(letter, index, None)?;
        self.add_signal(session.ctx_mut(), irq, width, &format!("{letter}-{index}"))
    }

    /// Opens the dump and records the current value of every traced signal.
    ///
    /// # Errors
    ///
    /// [`SimError::Trace`] on sink failure.
    pub fn start(&mut self, ctx: &SimContext) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        let TraceState {
            sink,
            signals,
            running,
            last_flush,
            ..
        } = &mut *state;
        if *running {
            return Ok(());
        }
        let now_ns = ctx.clock().cycles_to_nsec(ctx.now());
        sink.begin(now_ns)?;
        for (index, &irq) in signals.iter().enumerate() {
            sink.record(now_ns, index, ctx.value(irq))?;
        }
        *running = true;
        *last_flush = ctx.now();
        tracing::debug!(cycle = ctx.now(), signals = signals.len(), "trace started");
        Ok(())
    }

    /// Closes the dump.
    ///
    /// # Errors
    ///
    /// [`SimError::Trace`] with the first error the sink reported while running, or
    /// from closing the dump.
    pub fn stop(&mut self, ctx: &SimContext) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        if state.running {
            state.running = false;
            let now_ns = ctx.clock().cycles_to_nsec(ctx.now());
            let finished = state.sink.finish(now_ns);
            tracing::debug!(cycle = ctx.now(), "trace stopped");
            if let Some(e) = state.error.take() {
                return Err(e.into());
            }
            finished?;
        }
        Ok(())
    }

    /// Returns `true` between [`Self::start`] and [`Self::stop`].
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }
}
