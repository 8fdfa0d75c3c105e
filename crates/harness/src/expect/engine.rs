//! Windowed event-expectation engine.
//!
//! The engine subscribes one capture callback to every monitored signal. While a
//! window runs, each change of a monitored, non-ignored signal is appended to a FIFO
//! event queue as `(cycle, signal, value)`. After every core step the queue is drained
//! up to the window's end cycle and each event is matched against the pending
//! expectations:
//! 1. **Match:** The first identical pending `(signal, value)` pair is removed.
//! 2. **Unexpected:** An event with no pending pair is a problem; the window fails after the drain.
//! 3. **Carry-over:** Events captured after the end cycle stay queued for the next window.
//!
//! Expectations still pending when the cycle budget runs out fail the window.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use super::problem::{ExpectError, Problem};
use crate::common::SimError;
use crate::irq::{CallbackArg, CallbackId, IntoIrqValue, IrqId, IrqValue, SessionId};
use crate::sim::{Session, SimContext};

/// When a window may end before its cycle budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Always run the full budget.
    #[default]
    None,
    /// End at the step in which any expectation matched.
    FirstMatch,
    /// End at the step in which the last pending expectation matched.
    AllMatched,
}

/// A `(signal, value)` pair a window expects to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expectation {
    /// Expected signal.
    pub irq: IrqId,
    /// Expected value.
    pub value: IrqValue,
}

impl Expectation {
    /// Creates an expectation; booleans become 0/1.
    pub fn new(irq: impl Into<IrqId>, value: impl IntoIrqValue) -> Self {
        Self {
            irq: irq.into(),
            value: value.into_irq_value(),
        }
    }

    fn matches(&self, event: &Event) -> bool {
        self.irq == event.irq && self.value == event.value
    }
}

impl<I: Into<IrqId>, V: IntoIrqValue> From<(I, V)> for Expectation {
    fn from((irq, value): (I, V)) -> Self {
        Self::new(irq, value)
    }
}

/// A captured signal change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Cycle at capture.
    pub cycle: u64,
    /// Signal that changed.
    pub irq: IrqId,
    /// New value.
    pub value: IrqValue,
}

/// Outcome of a successful window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    /// Cycle the window started at.
    pub start_cycle: u64,
    /// Cycle budget boundary (`start_cycle + cycles`).
    pub end_cycle: u64,
    /// Cycle the window actually stopped at; may overshoot `end_cycle` by one step.
    pub finished_at: u64,
    /// The stop policy ended the window before the budget was spent.
    pub stopped_early: bool,
    /// Events that satisfied an expectation, in capture order.
    pub matched: Vec<Event>,
    /// Expectations left unmatched by an early stop.
    pub pending: Vec<Expectation>,
}

/// State shared with the capture callback.
#[derive(Debug, Default)]
struct Monitor {
    monitored: Vec<IrqId>,
    monitored_set: HashSet<IrqId>,
    ignored: HashSet<IrqId>,
    displayed: HashSet<IrqId>,
    events: VecDeque<Event>,
    suspended: bool,
}

impl Monitor {
    /// Records a change; returns `true` if it should be displayed.
    fn capture(&mut self, cycle: u64, irq: IrqId, value: IrqValue) -> bool {
        if !self.monitored_set.contains(&irq) {
            return false;
        }
        if !self.suspended && !self.ignored.contains(&irq) {
            self.events.push_back(Event { cycle, irq, value });
        }
        self.displayed.contains(&irq)
    }

    /// Pops the oldest event captured at or before `end_cycle`.
    fn next_due(&mut self, end_cycle: u64) -> Option<Event> {
        if self.events.front()?.cycle > end_cycle {
            return None;
        }
        self.events.pop_front()
    }
}

/// Matches captured signal changes against expectations, one window at a time.
///
/// The monitor sets and the event queue persist across windows and are cleared only
/// by [`ExpectEngine::reset`].
pub struct ExpectEngine {
    session: SessionId,
    callback: CallbackId,
    monitor: Rc<RefCell<Monitor>>,
}

impl fmt::Debug for ExpectEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectEngine")
            .field("session", &self.session)
            .field("callback", &self.callback)
            .field("monitor", &self.monitor.borrow())
            .finish()
    }
}

impl ExpectEngine {
    /// Creates an engine bound to the session owning `ctx`.
    pub fn new(ctx: &mut SimContext) -> Self {
        let monitor = Rc::new(RefCell::new(Monitor::default()));
        let shared = Rc::clone(&monitor);
        let callback = ctx.register_callback(move |ctx, value, arg| {
            let CallbackArg::Irq(irq) = *arg else {
                return;
            };
            let display = shared.borrow_mut().capture(ctx.now(), irq, value);
            if display {
                let line = format!("{} changed to {value}", ctx.name(irq));
                ctx.info(line);
            }
        });
        Self {
            session: ctx.session(),
            callback,
            monitor,
        }
    }

    /// Starts monitoring `irq`. Monitoring twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `ctx` or `irq` belongs to another session than the
    /// engine.
    pub fn monitor(&mut self, ctx: &mut SimContext, irq: impl Into<IrqId>) -> Result<(), SimError> {
        let irq = irq.into();
        if ctx.session() != self.session || !ctx.owns(irq) {
            return Err(SimError::ForeignIrq);
        }
        let mut monitor = self.monitor.borrow_mut();
        if monitor.monitored_set.insert(irq) {
            monitor.monitored.push(irq);
        }
        drop(monitor);
        let _ = ctx.subscribe(irq, self.callback, CallbackArg::Irq(irq));
        Ok(())
    }

    /// Excludes `irq` from matching; its changes may still be displayed.
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `irq` belongs to another session than the engine.
    pub fn ignore(&mut self, irq: impl Into<IrqId>) -> Result<(), SimError> {
        let irq = self.local(irq)?;
        let _ = self.monitor.borrow_mut().ignored.insert(irq);
        Ok(())
    }

    /// Logs every change of `irq` through [`SimContext::info`].
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `irq` belongs to another session than the engine.
    pub fn display(&mut self, irq: impl Into<IrqId>) -> Result<(), SimError> {
        let irq = self.local(irq)?;
        let _ = self.monitor.borrow_mut().displayed.insert(irq);
        Ok(())
    }

    fn local(&self, irq: impl Into<IrqId>) -> Result<IrqId, SimError> {
        let irq = irq.into();
        if irq.session() == self.session {
            Ok(irq)
        } else {
            Err(SimError::ForeignIrq)
        }
    }

    /// Returns `true` if `irq` is monitored.
    pub fn is_monitored(&self, irq: impl Into<IrqId>) -> bool {
        self.monitor.borrow().monitored_set.contains(&irq.into())
    }

    /// Monitored signals in registration order.
    pub fn monitored(&self) -> Vec<IrqId> {
        self.monitor.borrow().monitored.clone()
    }

    /// Events captured but not yet consumed by a window.
    pub fn queued(&self) -> Vec<Event> {
        self.monitor.borrow().events.iter().copied().collect()
    }

    /// Suspends or resumes event capture; display is unaffected.
    pub fn set_capturing(&mut self, capturing: bool) {
        self.monitor.borrow_mut().suspended = !capturing;
    }

    /// Clears the monitor sets and the event queue.
    pub fn reset(&mut self) {
        let mut monitor = self.monitor.borrow_mut();
        let suspended = monitor.suspended;
        *monitor = Monitor {
            suspended,
            ..Monitor::default()
        };
    }

    /// Runs `session` for up to `cycles` cycles and matches captured events against
    /// `expectations`.
    ///
    /// # Errors
    ///
    /// * [`SimError::ForeignIrq`] (wrapped) if `session` or an expected signal belongs to
    ///   another session than the engine.
    /// * [`SimError::NotMonitored`] (wrapped) if an expectation names an unmonitored signal.
    /// * [`ExpectError::Failed`] with the unexpected changes of the first failing step, or
    ///   with every expectation still pending when the budget runs out.
    /// * Any session error while stepping.
    pub fn expect_for_cycles(
        &mut self,
        session: &mut Session,
        cycles: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        let mut pending: Vec<Expectation> = expectations.into_iter().map(Into::into).collect();
        self.check_expectations(session.ctx(), &pending)?;

        let start_cycle = session.now();
        let end_cycle = start_cycle.saturating_add(cycles);
        let mut matched = Vec::new();
        tracing::debug!(
            start_cycle,
            end_cycle,
            expected = pending.len(),
            ?stop,
            "expectation window opened"
        );

        while session.now() < end_cycle {
            session.advance()?;

            let mut problems = Vec::new();
            let mut stopped = false;
            loop {
                let next = self.monitor.borrow_mut().next_due(end_cycle);
                let Some(event) = next else {
                    break;
                };
                if let Some(pos) = pending.iter().position(|e| e.matches(&event)) {
                    let _ = pending.remove(pos);
                    matched.push(event);
                    stopped |= match stop {
                        StopPolicy::None => false,
                        StopPolicy::FirstMatch => true,
                        StopPolicy::AllMatched => pending.is_empty(),
                    };
                } else {
                    problems.push(Problem::Unexpected {
                        irq: event.irq,
                        name: session.ctx().name(event.irq).to_owned(),
                        value: event.value,
                        cycle: event.cycle,
                    });
                }
            }

            if !problems.is_empty() {
                return Err(ExpectError::Failed { problems });
            }
            if stopped {
                return Ok(WindowReport {
                    start_cycle,
                    end_cycle,
                    finished_at: session.now(),
                    stopped_early: true,
                    matched,
                    pending,
                });
            }
        }

        if !pending.is_empty() {
            let problems = pending
                .iter()
                .map(|e| Problem::Missing {
                    irq: e.irq,
                    name: session.ctx().name(e.irq).to_owned(),
                    value: e.value,
                })
                .collect();
            return Err(ExpectError::Failed { problems });
        }
        Ok(WindowReport {
            start_cycle,
            end_cycle,
            finished_at: session.now(),
            stopped_early: false,
            matched,
            pending,
        })
    }

    /// [`Self::expect_for_cycles`] with the budget in microseconds.
    ///
    /// # Errors
    ///
    /// See [`Self::expect_for_cycles`].
    pub fn expect_for_us(
        &mut self,
        session: &mut Session,
        usecs: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        let cycles = session.usec_to_cycles(usecs);
        self.expect_for_cycles(session, cycles, expectations, stop)
    }

    /// [`Self::expect_for_cycles`] with the budget in milliseconds.
    ///
    /// # Errors
    ///
    /// See [`Self::expect_for_cycles`].
    pub fn expect_for_ms(
        &mut self,
        session: &mut Session,
        msecs: u64,
        expectations: impl IntoIterator<Item = impl Into<Expectation>>,
        stop: StopPolicy,
    ) -> Result<WindowReport, ExpectError> {
        self.expect_for_us(session, msecs.saturating_mul(1000), expectations, stop)
    }

    fn check_expectations(
        &self,
        ctx: &SimContext,
        expectations: &[Expectation],
    ) -> Result<(), SimError> {
        if ctx.session() != self.session {
            return Err(SimError::ForeignIrq);
        }
        let monitor = self.monitor.borrow();
        for e in expectations {
            let Some(name) = ctx.graph().get_name(e.irq) else {
                return Err(SimError::ForeignIrq);
            };
            if !monitor.monitored_set.contains(&e.irq) {
                return Err(SimError::NotMonitored {
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }
}
