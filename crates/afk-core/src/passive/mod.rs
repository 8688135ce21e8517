//! Passive Behavior Loop.
//!
//! A fixed-period tick that keeps the agent alive regardless of what the
//! request lifecycle is doing: potion upkeep while moving, circling
//! detection, fleeing the nearest hostile, and swimming when submerged. A
//! slower period re-equips the best armor. The loop only reads whether a
//! request is active; it never touches request state.

pub mod armor;
mod effects;

pub use effects::EffectTracker;

use crate::config::PassiveConfig;
use crate::ports::Ports;
use crate::presence::PresenceTracker;
use crate::timers::{TimerId, TimerQueue};
use afk_proto::{Control, Entity, EntityKind, Goal, Position};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassiveTimer {
    Tick,
    ArmorCheck,
    /// End of a flee burst: let go of sprint and jump.
    FleeRelease,
    /// End of a swim burst: let go of forward and jump.
    SwimRelease,
}

const FLEE_CONTROLS: [Control; 2] = [Control::Sprint, Control::Jump];
const SWIM_CONTROLS: [Control; 2] = [Control::Forward, Control::Jump];

/// What one tick did, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub applied_effects: Vec<String>,
    pub fled_from: Option<String>,
    pub swam: bool,
    pub started_circling: bool,
}

pub struct PassiveLoop {
    config: PassiveConfig,
    ports: Ports,
    effects: EffectTracker,
    timers: TimerQueue<PassiveTimer>,
    flee_release: Option<TimerId>,
    swim_release: Option<TimerId>,
    /// Controls held for the whole session (anti-AFK); bursts restore them.
    held: HashSet<Control>,
    running: bool,
}

impl PassiveLoop {
    pub fn new(config: PassiveConfig, ports: Ports) -> Self {
        Self {
            effects: EffectTracker::new(Duration::from_secs(config.effect_duration_secs)),
            config,
            ports,
            timers: TimerQueue::new(),
            flee_release: None,
            swim_release: None,
            held: HashSet::new(),
            running: false,
        }
    }

    /// Arms the periodic timers. Calling it again is a no-op.
    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.timers.schedule(now, self.config.tick(), PassiveTimer::Tick);
        self.timers.schedule(
            now,
            Duration::from_secs(self.config.armor_interval_secs),
            PassiveTimer::ArmorCheck,
        );
        debug!(tick_ms = self.config.tick_ms, "Passive loop started");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Presses `control` for the rest of the session.
    pub fn hold(&mut self, control: Control) {
        self.held.insert(control);
        self.ports.client.set_control(control, true);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn fire_due(&mut self, now: Instant, presence: &mut PresenceTracker, request_active: bool) {
        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                PassiveTimer::Tick => {
                    self.tick(now, presence, request_active);
                    self.timers.schedule(now, self.config.tick(), PassiveTimer::Tick);
                }
                PassiveTimer::ArmorCheck => {
                    armor::equip_best(&*self.ports.client);
                    self.timers.schedule(
                        now,
                        Duration::from_secs(self.config.armor_interval_secs),
                        PassiveTimer::ArmorCheck,
                    );
                }
                PassiveTimer::FleeRelease => {
                    self.flee_release = None;
                    self.release(&FLEE_CONTROLS);
                }
                PassiveTimer::SwimRelease => {
                    self.swim_release = None;
                    self.release(&SWIM_CONTROLS);
                }
            }
        }
    }

    /// Inventory changed: new armor may have arrived.
    pub fn on_inventory_changed(&mut self) {
        armor::equip_best(&*self.ports.client);
    }

    /// Effects do not survive death.
    pub fn on_death(&mut self) {
        self.effects.clear();
    }

    /// One survival pass.
    pub fn tick(
        &mut self,
        now: Instant,
        presence: &mut PresenceTracker,
        request_active: bool,
    ) -> TickReport {
        let mut report = TickReport::default();

        let motion_window = Duration::from_secs(self.config.motion_window_secs);
        if presence.moved_within(now, motion_window) {
            report.applied_effects =
                self.effects
                    .maintain(now, &*self.ports.client, &self.config.effects);
        }

        report.started_circling = presence.sample();

        if !request_active {
            report.fled_from = self.flee(now);
        }

        if self.ports.client.is_submerged() {
            debug!("Submerged, swimming");
            self.burst(now, Burst::Swim);
            report.swam = true;
        }
        report
    }

    fn flee(&mut self, now: Instant) -> Option<String> {
        let position = self.ports.client.position()?;
        let threat = self.nearest_hostile(&position)?;
        let distance = position.distance(&threat.position);
        info!(mob = %threat.name, distance = %format!("{distance:.2}"), "Hostile mob nearby, fleeing");

        let target = position.away_from(&threat.position, self.config.flee_distance);
        if let Err(e) = self
            .ports
            .navigator
            .set_destination(Goal::near(target, self.config.flee_radius))
        {
            warn!(error = %e, "Flee goal rejected");
        }
        self.burst(now, Burst::Flee);
        Some(threat.name)
    }

    fn nearest_hostile(&self, position: &Position) -> Option<Entity> {
        self.ports
            .client
            .entities()
            .into_iter()
            .filter(|entity| {
                entity.kind == EntityKind::Mob
                    && self.config.hostiles.iter().any(|h| *h == entity.name)
                    && entity.position.distance(position) < self.config.threat_radius
            })
            .min_by(|a, b| {
                a.position
                    .distance(position)
                    .total_cmp(&b.position.distance(position))
            })
    }

    /// Presses the burst controls and (re)arms their release. A newer burst
    /// replaces the pending release of an older one.
    fn burst(&mut self, now: Instant, kind: Burst) {
        let (controls, secs, kind_timer) = match kind {
            Burst::Flee => (FLEE_CONTROLS, self.config.flee_burst_secs, PassiveTimer::FleeRelease),
            Burst::Swim => (SWIM_CONTROLS, self.config.swim_burst_secs, PassiveTimer::SwimRelease),
        };
        for control in controls {
            self.ports.client.set_control(control, true);
        }
        let timer = self
            .timers
            .schedule(now, Duration::from_secs(secs), kind_timer);
        let previous = match kind {
            Burst::Flee => self.flee_release.replace(timer),
            Burst::Swim => self.swim_release.replace(timer),
        };
        if let Some(previous) = previous {
            self.timers.cancel(previous);
        }
    }

    fn release(&self, controls: &[Control]) {
        for control in controls {
            if self.burst_holds(*control) {
                continue;
            }
            self.ports
                .client
                .set_control(*control, self.held.contains(control));
        }
    }

    /// Whether another burst still in progress needs `control`.
    fn burst_holds(&self, control: Control) -> bool {
        (self.flee_release.is_some() && FLEE_CONTROLS.contains(&control))
            || (self.swim_release.is_some() && SWIM_CONTROLS.contains(&control))
    }
}

#[derive(Debug, Clone, Copy)]
enum Burst {
    Flee,
    Swim,
}
