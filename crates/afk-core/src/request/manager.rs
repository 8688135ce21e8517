//! The single-slot request lifecycle manager.

use super::plan::{Step, phased_timers};
use super::relocation::{Relocation, RelocationOutcome, Relocator, Started};
use super::{InterruptionFlags, Order, Phase, Request, RequestId};
use crate::config::{AgentConfig, RequestConfig};
use crate::notify::stamped;
use crate::ports::Ports;
use crate::status::RequestStatus;
use crate::timers::{Scheduled, TimerId, TimerQueue};
use afk_proto::{Category, Error, Goal, Position, Result, STACK_SIZE};
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deferred work owned by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// A step armed by request `request`; dropped if that request is gone.
    Phased { request: RequestId, step: Step },
    /// Poll of the detached return trip started by a cancellation.
    ReturnPoll,
}

/// Acknowledgment of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub id: RequestId,
    pub duration_minutes: u32,
    pub units: u32,
}

/// Result of a cancel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    NothingToCancel,
    Cancelled { id: RequestId },
}

/// Relocation back to whoever cancelled. Outlives the cancelled request.
struct ReturnTrip {
    relocation: Relocation,
    timer: TimerId,
}

/// Owns at most one in-flight request and drives it through its phases.
///
/// All methods take the current time explicitly. Deferred work lives in the
/// manager's own [`TimerQueue`] and runs from [`Scheduled::fire_due`].
pub struct RequestManager {
    name: String,
    config: RequestConfig,
    ports: Ports,
    relocator: Relocator,
    rng: SmallRng,
    timers: TimerQueue<Deferred>,
    active: Option<Request>,
    flags: InterruptionFlags,
    next_id: u64,
    return_trip: Option<ReturnTrip>,
}

impl RequestManager {
    pub fn new(config: &AgentConfig, ports: Ports) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Self {
            name: config.name.clone(),
            config: config.request.clone(),
            relocator: Relocator::new(ports.client.clone(), config.relocation.clone()),
            ports,
            rng,
            timers: TimerQueue::new(),
            active: None,
            flags: InterruptionFlags::default(),
            next_id: 1,
            return_trip: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Request> {
        self.active.as_ref()
    }

    pub fn flags(&self) -> InterruptionFlags {
        self.flags
    }

    /// Whether a cancellation return trip is still being confirmed.
    pub fn is_returning(&self) -> bool {
        self.return_trip.is_some()
    }

    /// Accepts a new request, or rejects it without touching any state.
    pub fn submit(&mut self, now: Instant, order: Order) -> Result<Accepted> {
        if order.stacks == 0 {
            return Err(Error::validation("Invalid number of stacks."));
        }
        if let Some(active) = &self.active {
            debug!(request = %active.id, requester = %order.requester, "Rejecting request while busy");
            return Err(Error::Conflict);
        }
        let units = order
            .stacks
            .checked_mul(STACK_SIZE)
            .ok_or_else(|| Error::validation("Invalid number of stacks."))?;
        let duration_minutes = order
            .stacks
            .checked_mul(order.resource.minutes_per_stack())
            .ok_or_else(|| Error::validation("Invalid number of stacks."))?;

        self.abort_return_trip();

        let origin = self.ports.client.position().unwrap_or_else(|| {
            warn!("Agent position unknown at acceptance, distance report will be off");
            Position::default()
        });
        let id = RequestId::new(self.next_id);
        self.next_id += 1;

        let mut request = Request {
            id,
            resource: order.resource,
            stacks: order.stacks,
            units,
            recipient: order.recipient,
            requester: order.requester,
            created_at: Utc::now(),
            accepted_at: now,
            origin,
            duration_minutes,
            phase: Phase::Traveling,
            timers: Vec::new(),
            wander: None,
            wander_paused: false,
            delivery: None,
        };

        let cloak = &self.config.cloak;
        let cloak_delay = (!cloak.commands.is_empty() || cloak.announcement.is_some())
            .then(|| Duration::from_secs(cloak.delay_secs));
        for (delay, step) in phased_timers(
            duration_minutes,
            self.config.progress_interval_minutes,
            self.config.near_completion_lead_minutes,
            cloak_delay,
        ) {
            let timer = self
                .timers
                .schedule(now, delay, Deferred::Phased { request: id, step });
            request.own(timer);
        }

        info!(
            request = %id,
            resource = %request.resource,
            stacks = request.stacks,
            duration_minutes,
            recipient = %request.recipient,
            requester = %request.requester,
            "Request accepted"
        );
        self.ports.sink.notify(
            Category::General,
            &stamped(&format!(
                "📦 **Request Started**\nItem: {}\nStacks: {}\nTime: {} minutes\nUser: {}",
                request.resource, request.stacks, duration_minutes, request.requester
            )),
        );
        self.active = Some(request);
        self.start_travel();

        Ok(Accepted {
            id,
            duration_minutes,
            units,
        })
    }

    /// Cancels the active request. Safe to call at any time.
    pub fn cancel(&mut self, now: Instant, initiator: &str) -> CancelOutcome {
        let Some(mut request) = self.active.take() else {
            debug!(initiator, "Nothing to cancel");
            return CancelOutcome::NothingToCancel;
        };

        let cancelled = self.timers.cancel_all(request.drain_timers());
        request.delivery = None;
        self.flags.awaiting_goal_phase_transition = false;
        if let Err(e) = request.transition(Phase::Cancelled) {
            warn!(request = %request.id, error = %e, "Cancelling from unexpected phase");
        }
        info!(request = %request.id, initiator, timers = cancelled, "Request cancelled");
        self.ports
            .sink
            .notify(Category::General, &format!("Request cancelled by {initiator}"));

        self.start_return_trip(now, initiator);
        CancelOutcome::Cancelled { id: request.id }
    }

    /// Snapshot of the active request.
    pub fn status(&self, now: Instant) -> Option<RequestStatus> {
        self.active
            .as_ref()
            .map(|request| RequestStatus::capture(request, self.flags, now))
    }

    /// Navigation arrival. Returns true if it moved the request into the
    /// wander phase.
    pub fn on_goal_reached(&mut self, now: Instant) -> bool {
        if !self.flags.awaiting_goal_phase_transition {
            debug!("Arrival without a pending outward goal, ignoring");
            return false;
        }
        self.flags.awaiting_goal_phase_transition = false;

        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.phase() != Phase::Traveling {
            debug!(request = %active.id, phase = %active.phase(), "Arrival outside travel phase");
            return false;
        }
        if let Err(e) = active.transition(Phase::Wandering) {
            warn!(request = %active.id, error = %e, "Could not start wandering");
            return false;
        }
        active.wander_paused = false;
        info!(request = %active.id, "Reached gathering area, wandering");
        self.wander_step(now);
        true
    }

    /// Death of the agent. Returns true if a request was interrupted.
    pub fn on_death(&mut self) -> bool {
        // The navigation goal dies with the body.
        self.flags.awaiting_goal_phase_transition = false;

        let Some(active) = self.active.as_mut() else {
            return false;
        };
        self.flags.died_mid_request = true;
        active.wander_paused = true;
        if let Some(timer) = active.take_wander() {
            self.timers.cancel(timer);
        }
        warn!(request = %active.id, phase = %active.phase(), "Died during request");
        self.ports.sink.notify(
            Category::General,
            &format!("💀 {} died during gathering, continuing process.", self.name),
        );
        true
    }

    /// Respawn of the agent. Resumes whatever the death interrupted.
    pub fn on_respawn(&mut self, now: Instant) {
        if !self.flags.died_mid_request {
            return;
        }
        self.flags.died_mid_request = false;

        let Some(active) = self.active.as_mut() else {
            return;
        };
        match active.phase() {
            Phase::Traveling => {
                info!(request = %active.id, "Respawned, resuming outward travel");
                active.wander_paused = false;
                self.start_travel();
            }
            Phase::Wandering => {
                info!(request = %active.id, "Respawned, resuming wander");
                active.wander_paused = false;
                self.wander_step(now);
            }
            phase => debug!(request = %active.id, %phase, "Respawned, nothing to resume"),
        }
    }

    /// Session resumed. Timers kept running in-process, so this only tells
    /// observers the job is still alive.
    pub fn on_reconnect(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        info!(request = %active.id, "Reconnected with request in flight");
        self.ports.say(&self.config.recovery_message);
        true
    }

    fn start_travel(&mut self) {
        self.flags.awaiting_goal_phase_transition = true;
        let Some(position) = self.ports.client.position() else {
            warn!("Agent position unknown, outward travel not issued");
            return;
        };
        let angle = self.rng.gen_range(0.0..TAU);
        let target = position.offset(angle, self.config.travel_distance);
        match self
            .ports
            .navigator
            .set_destination(Goal::near(target, self.config.travel_radius))
        {
            Ok(()) => debug!(%target, "Outward travel issued"),
            Err(e) => warn!(error = %e, "Outward travel goal rejected"),
        }
    }

    fn wander_step(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.phase() != Phase::Wandering || active.wander_paused {
            return;
        }

        let wander = &self.config.wander;
        match self.ports.client.position() {
            Some(position) => {
                let distance = self
                    .rng
                    .gen_range(wander.min_distance..=wander.max_distance);
                let angle = self.rng.gen_range(0.0..TAU);
                let target = position.offset(angle, distance);
                if let Err(e) = self
                    .ports
                    .navigator
                    .set_destination(Goal::near(target, wander.radius))
                {
                    warn!(error = %e, "Wander goal rejected");
                } else {
                    debug!(%target, "Wandering");
                }
            }
            None => debug!("Agent position unknown, skipping wander leg"),
        }

        let delay = Duration::from_secs(
            self.rng
                .gen_range(wander.min_interval_secs..=wander.max_interval_secs),
        );
        let timer = self.timers.schedule(
            now,
            delay,
            Deferred::Phased {
                request: active.id,
                step: Step::Wander,
            },
        );
        active.own(timer);
        active.wander = Some(timer);
    }

    fn dispatch(&mut self, now: Instant, timer: TimerId, deferred: Deferred) {
        match deferred {
            Deferred::ReturnPoll => self.poll_return_trip(now, timer),
            Deferred::Phased { request, step } => {
                let Some(active) = self.active.as_mut() else {
                    debug!(%timer, %request, "Timer outlived its request");
                    return;
                };
                if active.id != request || !active.release(timer) {
                    debug!(%timer, %request, live = %active.id, "Dropping stale timer");
                    return;
                }
                self.run_step(now, step);
            }
        }
    }

    fn run_step(&mut self, now: Instant, step: Step) {
        let Some(active) = &self.active else {
            return;
        };
        match step {
            Step::Cloak => {
                debug!(request = %active.id, "Applying cloak");
                for command in &self.config.cloak.commands {
                    self.ports.say(command);
                }
                if let Some(announcement) = &self.config.cloak.announcement {
                    self.ports.say(announcement);
                }
            }
            Step::Progress { remaining_minutes } => {
                info!(request = %active.id, remaining_minutes, "Progress");
                self.ports.sink.notify(
                    Category::General,
                    &format!(
                        "ITEM: {}\nTIME: {} minutes\nUSER: {}",
                        active.resource, remaining_minutes, active.requester
                    ),
                );
            }
            Step::NearCompletion => {
                info!(request = %active.id, "Nearly done");
                self.ports.sink.notify(
                    Category::General,
                    &format!(
                        "ITEM: {}\nTIME: nearly done, give me {} minutes\nUSER: {}",
                        active.resource,
                        self.config.near_completion_lead_minutes,
                        active.requester
                    ),
                );
            }
            Step::Wander => self.wander_step(now),
            Step::Completion => self.begin_delivery(now),
            Step::DeliveryPoll => self.poll_delivery(now),
        }
    }

    /// Completion timer: grant the items and start moving to the recipient.
    fn begin_delivery(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = active.transition(Phase::Delivering) {
            warn!(request = %active.id, error = %e, "Completion fired in wrong phase");
            return;
        }
        // Stops the wander loop along with anything else still pending.
        self.timers.cancel_all(active.drain_timers());
        self.flags.awaiting_goal_phase_transition = false;

        let id = active.id;
        let recipient = active.recipient.clone();
        info!(request = %id, %recipient, units = active.units, "Delivering");
        self.ports
            .say(&format!("/give @s {} {}", active.resource, active.units));

        match self.relocator.start(&recipient) {
            Started::Settled(outcome) => self.finish_delivery(outcome),
            Started::Pending(relocation) => {
                let timer = self.timers.schedule(
                    now,
                    self.relocator.config().poll_interval(),
                    Deferred::Phased {
                        request: id,
                        step: Step::DeliveryPoll,
                    },
                );
                if let Some(active) = self.active.as_mut() {
                    active.own(timer);
                    active.delivery = Some(relocation);
                }
            }
        }
    }

    fn poll_delivery(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(mut relocation) = active.delivery.take() else {
            warn!(request = %active.id, "Delivery poll without a relocation");
            return;
        };
        match self.relocator.poll(&mut relocation) {
            None => {
                let timer = self.timers.schedule(
                    now,
                    self.relocator.config().poll_interval(),
                    Deferred::Phased {
                        request: active.id,
                        step: Step::DeliveryPoll,
                    },
                );
                active.own(timer);
                active.delivery = Some(relocation);
            }
            Some(outcome) => self.finish_delivery(outcome),
        }
    }

    fn finish_delivery(&mut self, outcome: RelocationOutcome) {
        let Some(mut request) = self.active.take() else {
            return;
        };
        self.ports.say(&self.config.drop_message);

        match self.ports.client.position() {
            Some(end) => info!(
                request = %request.id,
                %outcome,
                "Request completed. Distance traveled: {:.2} blocks",
                request.origin.horizontal_distance(&end)
            ),
            None => info!(request = %request.id, %outcome, "Request completed"),
        }

        self.timers.cancel_all(request.drain_timers());
        if let Err(e) = request.transition(Phase::Completed) {
            warn!(request = %request.id, error = %e, "Completing from unexpected phase");
        }
        self.ports.sink.notify(
            Category::General,
            &stamped(&format!(
                "✅ **Request Complete**\nItem: {}\nAmount: {}\nUser: {}\nDelivered to: {} ({})",
                request.resource, request.units, request.requester, request.recipient, outcome
            )),
        );
    }

    fn start_return_trip(&mut self, now: Instant, initiator: &str) {
        match self.relocator.start(initiator) {
            Started::Settled(_) => {}
            Started::Pending(relocation) => {
                let timer = self.timers.schedule(
                    now,
                    self.relocator.config().poll_interval(),
                    Deferred::ReturnPoll,
                );
                self.return_trip = Some(ReturnTrip { relocation, timer });
            }
        }
    }

    fn poll_return_trip(&mut self, now: Instant, timer: TimerId) {
        let Some(mut trip) = self.return_trip.take() else {
            return;
        };
        if trip.timer != timer {
            self.return_trip = Some(trip);
            return;
        }
        match self.relocator.poll(&mut trip.relocation) {
            None => {
                trip.timer = self.timers.schedule(
                    now,
                    self.relocator.config().poll_interval(),
                    Deferred::ReturnPoll,
                );
                self.return_trip = Some(trip);
            }
            Some(outcome) => {
                info!(player = %trip.relocation.target, %outcome, "Return trip settled");
            }
        }
    }

    fn abort_return_trip(&mut self) {
        if let Some(trip) = self.return_trip.take() {
            self.timers.cancel(trip.timer);
            debug!(player = %trip.relocation.target, "Return trip aborted by new request");
        }
    }
}

impl Scheduled for RequestManager {
    fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    fn fire_due(&mut self, now: Instant) {
        while let Some((timer, deferred)) = self.timers.pop_due(now) {
            self.dispatch(now, timer, deferred);
        }
    }
}
