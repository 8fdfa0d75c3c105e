//! Cycle timer scheduler.
//!
//! The scheduler is the sole owner of every live timer: the callback box lives in the
//! `timers` map from scheduling until the timer retires or is cancelled, independent
//! of whether the caller kept the [`TimerId`].
//!
//! Pending deadlines sit in a min-heap keyed by `(target, seq)`. Rescheduling or
//! cancelling does not search the heap; the entry's `seq` is bumped instead and
//! queue entries whose `seq` no longer matches are discarded when they surface. Once
//! stale entries outnumber live timers the heap is rebuilt from the current ones.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use crate::common::SimError;
use crate::irq::CallbackArg;
use crate::sim::SimContext;

/// Timer callback. The return value decides what happens next:
/// `None` or `Some(0)` retires the timer, `Some(n)` fires it again `n` cycles later.
pub type TimerFn = dyn FnMut(&mut SimContext, &CallbackArg) -> Option<u64>;

/// Identity of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw identifier.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Queue length below which stale entries are left to surface on their own.
const COMPACT_THRESHOLD: usize = 64;

/// Heap entry; ordered by deadline, then by scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    target: u64,
    seq: u64,
    id: TimerId,
}

struct TimerEntry {
    target: u64,
    seq: u64,
    arg: CallbackArg,
    /// `None` while the callback is running.
    callback: Option<Box<TimerFn>>,
}

/// Callback taken out of the scheduler for one invocation.
pub(crate) struct Firing {
    pub id: TimerId,
    pub seq: u64,
    pub arg: CallbackArg,
    pub callback: Box<TimerFn>,
}

/// Cycle-indexed timer queue and owned timer set.
#[derive(Default)]
pub struct Scheduler {
    timers: HashMap<TimerId, TimerEntry>,
    queue: BinaryHeap<Reverse<Deadline>>,
    next_id: u64,
    next_seq: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("live", &self.timers.len())
            .field("queued", &self.queue.len())
            .field("next_deadline", &self.next_deadline())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to fire at `now + delay`.
    ///
    /// # Errors
    ///
    /// [`SimError::ZeroDelay`] if `delay` is zero; the delay is never clamped.
    pub fn schedule(
        &mut self,
        now: u64,
        delay: u64,
        callback: Box<TimerFn>,
        arg: CallbackArg,
    ) -> Result<TimerId, SimError> {
        if delay == 0 {
            return Err(SimError::ZeroDelay);
        }
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let target = now.saturating_add(delay);
        let seq = self.enqueue(id, target);
        let _ = self.timers.insert(
            id,
            TimerEntry {
                target,
                seq,
                arg,
                callback: Some(callback),
            },
        );
        tracing::trace!(timer = id.0, target, "timer scheduled");
        Ok(id)
    }

    /// Moves a live timer to `now + delay`; a zero delay cancels it.
    ///
    /// Returns `false` if the timer is no longer live.
    pub fn reschedule(&mut self, now: u64, id: TimerId, delay: u64) -> bool {
        if delay == 0 {
            return self.cancel(id);
        }
        if !self.timers.contains_key(&id) {
            return false;
        }
        let target = now.saturating_add(delay);
        let seq = self.enqueue(id, target);
        if let Some(entry) = self.timers.get_mut(&id) {
            entry.target = target;
            entry.seq = seq;
        }
        tracing::trace!(timer = id.0, target, "timer rescheduled");
        true
    }

    /// Drops a timer. Cancelling a retired or already cancelled timer is a no-op.
    ///
    /// Returns `true` if the timer was live.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let live = self.timers.remove(&id).is_some();
        if live {
            tracing::trace!(timer = id.0, "timer cancelled");
        }
        live
    }

    /// Returns `true` while the scheduler still owns the timer.
    pub fn is_live(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Absolute cycle the timer will fire at.
    pub fn target(&self, id: TimerId) -> Option<u64> {
        self.timers.get(&id).map(|e| e.target)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns `true` if no timer is live.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of heap entries, stale ones included.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Earliest deadline among live, queued timers.
    pub fn next_deadline(&self) -> Option<u64> {
        match self.queue.peek() {
            Some(Reverse(top)) if self.is_current(top) => Some(top.target),
            _ => self
                .queue
                .iter()
                .filter(|Reverse(d)| self.is_current(d))
                .map(|Reverse(d)| d.target)
                .min(),
        }
    }

    /// Drops every live timer; identifiers are never reused afterwards.
    ///
    /// Returns the number of timers dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let live = self.timers.len();
        self.timers.clear();
        self.queue.clear();
        live
    }

    /// Takes the next timer due at or before `now` out of the queue.
    pub(crate) fn pop_due(&mut self, now: u64) -> Option<Firing> {
        while let Some(Reverse(deadline)) = self.queue.peek().copied() {
            if deadline.target > now {
                return None;
            }
            let _ = self.queue.pop();
            if !self.is_current(&deadline) {
                continue;
            }
            let Some(entry) = self.timers.get_mut(&deadline.id) else {
                continue;
            };
            let Some(callback) = entry.callback.take() else {
                continue;
            };
            return Some(Firing {
                id: deadline.id,
                seq: entry.seq,
                arg: entry.arg.clone(),
                callback,
            });
        }
        None
    }

    /// Returns the callback after it ran and applies its verdict.
    ///
    /// A timer cancelled from inside its own callback stays cancelled. A timer that
    /// rescheduled itself keeps that deadline unless the callback returned a new delay.
    pub(crate) fn settle(&mut self, firing: Firing, now: u64, next: Option<u64>) -> bool {
        let Firing {
            id, seq, callback, ..
        } = firing;
        let Some(entry) = self.timers.get_mut(&id) else {
            return false;
        };
        entry.callback = Some(callback);
        match next {
            Some(delay) if delay > 0 => self.reschedule(now, id, delay),
            _ if entry.seq != seq => true,
            _ => {
                let _ = self.timers.remove(&id);
                tracing::trace!(timer = id.0, "timer retired");
                false
            }
        }
    }

    fn enqueue(&mut self, id: TimerId, target: u64) -> u64 {
        self.compact();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Deadline { target, seq, id }));
        seq
    }

    /// Drops stale entries once they make up more than half of the queue.
    fn compact(&mut self) {
        let len = self.queue.len();
        if len < COMPACT_THRESHOLD || len <= 2 * self.timers.len() {
            return;
        }
        let timers = &self.timers;
        self.queue
            .retain(|Reverse(d)| timers.get(&d.id).is_some_and(|e| e.seq == d.seq));
        tracing::trace!(before = len, after = self.queue.len(), "timer queue compacted");
    }

    fn is_current(&self, deadline: &Deadline) -> bool {
        self.timers
            .get(&deadline.id)
            .is_some_and(|e| e.seq == deadline.seq)
    }
}
