//! Per-session simulation context.
//!
//! This module defines the object every callback receives. It owns:
//! 1. **Time:** The session clock, moved forward only by the core.
//! 2. **Signals:** The signal graph, including subscriber callbacks.
//! 3. **Timers:** The cycle timer scheduler.
//! 4. **Bookkeeping:** Statistics and the cycle of the last info message.
//!
//! Subscriber and timer callbacks get `&mut SimContext`, so they may raise further
//! signals, connect nodes, and (re)schedule or cancel timers inline. Nothing here is
//! global; two sessions never share a context.

use std::fmt;
use std::rc::Rc;

use crate::common::{Clock, SimError};
use crate::config::GeneralConfig;
use crate::irq::{
    CallbackArg, CallbackId, CoreIrq, ExternalIrq, IntoIrqValue, IrqId, IrqValue, OwnedIrq,
    SessionId, SignalGraph, Subscription,
};
use crate::stats::SimStats;
use crate::timer::{Scheduler, TimerId};

/// Everything a session owns apart from the core itself.
#[derive(Debug)]
pub struct SimContext {
    session: SessionId,
    clock: Clock,
    graph: SignalGraph,
    timers: Scheduler,
    stats: SimStats,
    last_info_cycle: u64,
    quiet: bool,
    trace_irqs: bool,
}

impl SimContext {
    /// Creates a context for a fresh session running at `frequency` Hz.
    pub fn new(frequency: u32, general: &GeneralConfig) -> Self {
        let session = SessionId::next();
        Self {
            session,
            clock: Clock::new(frequency),
            graph: SignalGraph::new(session),
            timers: Scheduler::new(),
            stats: SimStats::default(),
            last_info_cycle: 0,
            quiet: general.quiet,
            trace_irqs: general.trace_irqs,
        }
    }

    /// Identity of the owning session.
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Current cycle.
    #[inline]
    pub const fn now(&self) -> u64 {
        self.clock.cycle()
    }

    /// Session clock.
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Moves simulated time forward. Only the core calls this, from [`crate::SimCore::step`].
    #[inline]
    pub const fn advance_clock(&mut self, cycles: u64) {
        self.clock.advance(cycles);
    }

    /// Signal graph.
    pub const fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    /// Mutable signal graph, for renaming and inspection helpers.
    pub const fn graph_mut(&mut self) -> &mut SignalGraph {
        &mut self.graph
    }

    /// Timer scheduler.
    pub const fn timers(&self) -> &Scheduler {
        &self.timers
    }

    /// Statistics collected so far.
    pub const fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut SimStats {
        &mut self.stats
    }

    /// Allocates a fresh signal owned by this session.
    pub fn alloc_irq(&mut self, name: &str) -> OwnedIrq {
        let id = self.graph.alloc(name);
        tracing::trace!(%id, name, "irq allocated");
        OwnedIrq::new(id)
    }

    /// Releases a signal allocated by [`Self::alloc_irq`].
    ///
    /// # Errors
    ///
    /// [`SimError::ForeignIrq`] if `irq` was allocated by another session.
    pub fn release_irq(&mut self, irq: OwnedIrq) -> Result<(), SimError> {
        if irq.session() != self.session {
            return Err(SimError::ForeignIrq);
        }
        self.graph.release(irq.id());
        tracing::trace!(id = %irq.id(), "irq released");
        Ok(())
    }

    /// Returns the node viewing the core signal `handle`, attaching it under `name` on
    /// first use. An existing node keeps its name.
    pub fn core_irq(&mut self, handle: ExternalIrq, name: &str) -> CoreIrq {
        let id = self.graph.attach(handle, name);
        CoreIrq::new(id, handle)
    }

    /// Raises the core signal `handle`. Cores use this to report pin and peripheral changes.
    pub fn raise_external(&mut self, handle: ExternalIrq, value: impl IntoIrqValue) {
        let id = match self.graph.lookup(handle) {
            Some(id) => id,
            None => self.graph.attach(handle, &Self::placeholder_name(handle)),
        };
        self.raise_id(id, value.into_irq_value());
    }

    /// Name given to a core signal first seen through [`Self::raise_external`].
    pub(crate) fn placeholder_name(handle: ExternalIrq) -> String {
        format!("ext{}", handle.0)
    }

    /// Sets `irq` to `value`, notifies its subscribers in registration order, then
    /// raises every edge destination with the same value, depth first.
    ///
    /// # Panics
    ///
    /// Panics if `irq` was released or belongs to another session.
    pub fn raise(&mut self, irq: impl Into<IrqId>, value: impl IntoIrqValue) {
        self.raise_id(irq.into(), value.into_irq_value());
    }

    fn raise_id(&mut self, irq: IrqId, value: IrqValue) {
        let fanout = self.graph.latch(irq, value);
        self.stats.raises += 1;
        if self.trace_irqs {
            tracing::debug!(cycle = self.now(), irq = self.graph.name(irq), value, "raise");
        } else {
            tracing::trace!(cycle = self.now(), irq = self.graph.name(irq), value, "raise");
        }
        for (callback, arg) in fanout.subscribers {
            self.stats.notifications += 1;
            callback(self, value, &arg);
        }
        for destination in fanout.edges {
            if !self.graph.is_released(destination) {
                self.raise_id(destination, value);
            }
        }
    }

    /// Last value raised on `irq`.
    pub fn value(&self, irq: impl Into<IrqId>) -> IrqValue {
        self.graph.value(irq.into())
    }

    /// Returns `true` if `irq` is a signal of this session.
    pub fn owns(&self, irq: impl Into<IrqId>) -> bool {
        self.graph.contains(irq.into())
    }

    /// Display name of `irq`.
    pub fn name(&self, irq: impl Into<IrqId>) -> &str {
        self.graph.name(irq.into())
    }

    /// Makes every raise of `source` also raise `destination`.
    ///
    /// # Panics
    ///
    /// Panics if either signal belongs to another session.
    pub fn connect(&mut self, source: impl Into<IrqId>, destination: impl Into<IrqId>) {
        self.graph.connect(source.into(), destination.into());
    }

    /// Stores a subscriber callback for use with [`Self::subscribe`].
    pub fn register_callback<F>(&mut self, callback: F) -> CallbackId
    where
        F: Fn(&mut Self, IrqValue, &CallbackArg) + 'static,
    {
        self.graph.register_callback(Rc::new(callback))
    }

    /// Subscribes `callback` to `irq` with `arg`.
    ///
    /// Returns `false` if the same `(irq, callback, arg)` triple was already subscribed.
    pub fn subscribe(
        &mut self,
        irq: impl Into<IrqId>,
        callback: CallbackId,
        arg: impl Into<CallbackArg>,
    ) -> bool {
        self.graph.subscribe(Subscription {
            irq: irq.into(),
            callback,
            arg: arg.into(),
        })
    }

    /// Registers `callback` and subscribes it to `irq` without an argument.
    pub fn on_change<F>(&mut self, irq: impl Into<IrqId>, callback: F) -> CallbackId
    where
        F: Fn(&mut Self, IrqValue) + 'static,
    {
        let id = self.register_callback(move |ctx, value, _| callback(ctx, value));
        let _ = self.subscribe(irq, id, CallbackArg::None);
        id
    }

    /// Schedules `callback` to fire `cycles` from now.
    ///
    /// The callback returns `None` (or `Some(0)`) to retire, or `Some(n)` to fire
    /// again `n` cycles after the cycle it ran at.
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
        F: FnMut(&mut Self, &CallbackArg) -> Option<u64> + 'static,
    {
        let now = self.now();
        let id = self
            .timers
            .schedule(now, cycles, Box::new(callback), arg.into())?;
        self.stats.timers_scheduled += 1;
        Ok(id)
    }

    /// Schedules `callback` to fire `usecs` microseconds from now.
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
        F: FnMut(&mut Self, &CallbackArg) -> Option<u64> + 'static,
    {
        let cycles = self.clock.usec_to_cycles(usecs);
        self.add_timer(cycles, callback, arg)
    }

    /// Moves a live timer to fire `cycles` from now; zero cancels it.
    ///
    /// Returns `false` if the timer already retired or was cancelled.
    pub fn reschedule_timer(&mut self, id: TimerId, cycles: u64) -> bool {
        if cycles == 0 {
            return self.cancel_timer(id);
        }
        let now = self.now();
        self.timers.reschedule(now, id, cycles)
    }

    /// Cancels a timer. Safe to call repeatedly and from the timer's own callback.
    ///
    /// Returns `true` if the timer was live.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        let live = self.timers.cancel(id);
        if live {
            self.stats.timers_cancelled += 1;
        }
        live
    }

    /// Drops every live timer.
    pub(crate) fn cancel_all_timers(&mut self) {
        let cancelled = self.timers.clear();
        self.stats.timers_cancelled += cancelled as u64;
    }

    /// Fires every timer whose target cycle has been reached, in deadline order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn run_due_timers(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(mut firing) = self.timers.pop_due(now) {
            fired += 1;
            self.stats.timers_fired += 1;
            tracing::trace!(timer = firing.id.as_raw(), cycle = now, "timer fired");
            let next = (firing.callback)(self, &firing.arg);
            let _ = self.timers.settle(firing, now, next);
        }
        fired
    }

    /// Formats `message` with the time elapsed since the previous info message:
    /// `+<cycles> (<ms> ms, <us> us, <ns> ns): <message>`.
    pub fn info_line(&self, message: impl fmt::Display) -> String {
        let diff = self.now().saturating_sub(self.last_info_cycle);
        let ns = self.clock.cycles_to_nsec(diff);
        let us = ns / 1000;
        let ms = us / 1000;
        format!("+{diff} ({ms} ms, {} us, {} ns): {message}", us % 1000, ns % 1000)
    }

    /// Logs a cycle-stamped message and restarts the elapsed-time reference.
    pub fn info(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            let line = self.info_line(message);
            tracing::info!(cycle = self.now(), "{line}");
        }
        self.last_info_cycle = self.now();
    }
}
