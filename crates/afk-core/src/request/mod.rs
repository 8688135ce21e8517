//! The request lifecycle.
//!
//! A request is a single gather-and-deliver job. It moves through
//! `traveling → wandering → delivering → completed`, or to `cancelled` from
//! any live phase, and owns every timer it arms. At most one request is
//! active at a time; the [`RequestManager`] holds it in an optional slot.

mod manager;
mod plan;
mod relocation;

pub use manager::{Accepted, CancelOutcome, RequestManager};
pub use plan::{Step, phased_timers};
pub use relocation::{RelocationOutcome, Relocator};

use crate::timers::TimerId;
use afk_proto::{Error, Position, ResourceKind, Result};
use chrono::{DateTime, Utc};
use relocation::Relocation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Generation token of a request. Every deferred callback carries the id of
/// the request that armed it and is dropped if that request is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Traveling,
    Wandering,
    Delivering,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Traveling => "traveling",
            Phase::Wandering => "wandering",
            Phase::Delivering => "delivering",
            Phase::Completed => "completed",
            Phase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }

    /// Allowed edges of the lifecycle state machine.
    ///
    /// Completion can fire before the outward trip arrives, so
    /// `traveling → delivering` is legal.
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::{Cancelled, Completed, Delivering, Traveling, Wandering};
        matches!(
            (self, next),
            (Traveling, Wandering)
                | (Traveling | Wandering, Delivering)
                | (Delivering, Completed)
                | (Traveling | Wandering | Delivering, Cancelled)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a player asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub resource: ResourceKind,
    /// Number of 64-unit stacks.
    pub stacks: u32,
    /// Player to deliver to, already resolved from "me".
    pub recipient: String,
    /// Player who issued the command.
    pub requester: String,
}

impl Order {
    pub fn new(
        resource: impl Into<ResourceKind>,
        stacks: u32,
        recipient: impl Into<String>,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            stacks,
            recipient: recipient.into(),
            requester: requester.into(),
        }
    }
}

/// Process-wide interruption state.
///
/// Both flags start false, are only changed by the death, respawn and
/// arrival handlers, and never outlive the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InterruptionFlags {
    /// The agent died while a request was active and has not resumed yet.
    pub died_mid_request: bool,
    /// An outward-travel goal was issued and its arrival not yet observed.
    pub awaiting_goal_phase_transition: bool,
}

/// The in-flight request.
#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub resource: ResourceKind,
    pub stacks: u32,
    /// `stacks * 64`.
    pub units: u32,
    pub recipient: String,
    pub requester: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Instant,
    /// Agent position at acceptance, for the distance-travelled report.
    pub origin: Position,
    pub duration_minutes: u32,
    phase: Phase,
    /// Every timer this request armed and that has not fired yet.
    timers: Vec<TimerId>,
    wander: Option<TimerId>,
    wander_paused: bool,
    delivery: Option<Relocation>,
}

impl Request {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Timers owned by this request that are still outstanding.
    pub fn scheduled_timers(&self) -> &[TimerId] {
        &self.timers
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes) * 60)
    }

    pub fn due_at(&self) -> Instant {
        self.accepted_at + self.duration()
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.due_at().saturating_duration_since(now)
    }

    pub fn is_wander_paused(&self) -> bool {
        self.wander_paused
    }

    fn transition(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        self.phase = next;
        Ok(())
    }

    fn own(&mut self, timer: TimerId) {
        self.timers.push(timer);
    }

    /// Drops `timer` from the owned set. False means the timer is not ours
    /// (anymore) and its callback must not act.
    fn release(&mut self, timer: TimerId) -> bool {
        match self.timers.iter().position(|t| *t == timer) {
            Some(index) => {
                self.timers.swap_remove(index);
                if self.wander == Some(timer) {
                    self.wander = None;
                }
                true
            }
            None => false,
        }
    }

    /// Hands back every owned timer for cancellation.
    fn drain_timers(&mut self) -> Vec<TimerId> {
        self.wander = None;
        std::mem::take(&mut self.timers)
    }

    /// Removes the wander timer from the owned set and returns it.
    fn take_wander(&mut self) -> Option<TimerId> {
        let timer = self.wander.take()?;
        self.timers.retain(|t| *t != timer);
        Some(timer)
    }
}
