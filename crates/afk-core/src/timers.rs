//! `TimerQueue`: deadline-ordered deferred work.
//!
//! Every component that needs delayed or periodic callbacks owns one queue.
//! The agent loop sleeps until the earliest deadline across all queues and
//! then drains whatever is due, so all deferred work runs on the one event
//! loop task.
//!
//! Entries are keyed by `(deadline, id)`. Ids increase monotonically, so two
//! timers due at the same instant fire in the order they were scheduled.
//! Cancellation removes the entry immediately: once `cancel` returns, the
//! timer can no longer be popped.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Priority queue of deferred work items of type `K`.
#[derive(Debug)]
pub struct TimerQueue<K> {
    entries: BTreeMap<(Instant, TimerId), K>,
    deadlines: HashMap<TimerId, Instant>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to fire `delay` after `now`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, kind: K) -> TimerId {
        self.schedule_at(now + delay, kind)
    }

    /// Schedules `kind` to fire at `deadline`.
    pub fn schedule_at(&mut self, deadline: Instant, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((deadline, id), kind);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Removes a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.entries.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancels every id yielded by `ids`, returning how many were still pending.
    pub fn cancel_all(&mut self, ids: impl IntoIterator<Item = TimerId>) -> usize {
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Pops the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, K)> {
        let (&(deadline, id), _) = self.entries.iter().next()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.entries.remove(&(deadline, id)).map(|kind| (id, kind))
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.deadlines.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A component driven by its own timer queue.
pub trait Scheduled {
    fn next_deadline(&self) -> Option<Instant>;

    /// Fires everything due at `now`.
    fn fire_due(&mut self, now: Instant);
}

/// Fires every deadline up to `until` in order, each at its own instant,
/// so that work rescheduled from a callback keeps exact spacing.
pub fn run_until(component: &mut impl Scheduled, until: Instant) {
    while let Some(deadline) = component.next_deadline().filter(|d| *d <= until) {
        component.fire_due(deadline);
    }
}
