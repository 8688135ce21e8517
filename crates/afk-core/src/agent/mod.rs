//! The agent event loop.
//!
//! `Agent` owns every behaviour and runs them all on one task: world events
//! and status queries arrive over a channel, deferred work sits in the
//! components' timer queues, and the loop sleeps until whichever comes
//! first. Nothing here blocks, so the passive loop keeps ticking while a
//! request is in flight.

#[cfg(test)]
mod tests;

use crate::config::AgentConfig;
use crate::monitor::{DeathMonitor, InventoryMonitor, VitalsMonitor, is_teleport_request};
use crate::passive::PassiveLoop;
use crate::ports::Ports;
use crate::presence::PresenceTracker;
use crate::request::RequestManager;
use crate::router::{Router, parse};
use crate::status::AgentStatus;
use crate::timers::{Scheduled, TimerId, TimerQueue};
use afk_proto::{Category, Control, Goal, ItemStack, WorldEvent};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Something for the agent to react to.
#[derive(Debug)]
pub enum Input {
    World(WorldEvent),
    /// Reply with a snapshot of the agent.
    StatusQuery(oneshot::Sender<AgentStatus>),
}

/// Session-scoped periodic work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    InventoryReconcile,
    Announce { index: usize },
}

pub struct Agent {
    config: AgentConfig,
    ports: Ports,
    manager: RequestManager,
    passive: PassiveLoop,
    presence: PresenceTracker,
    router: Router,
    inventory: InventoryMonitor,
    vitals: VitalsMonitor,
    deaths: DeathMonitor,
    timers: TimerQueue<SessionTimer>,
    reconcile: Option<TimerId>,
    announce: Option<TimerId>,
    /// Number of `Joined` events seen; more than one means a reconnection.
    sessions: u32,
}

impl Agent {
    pub fn new(config: AgentConfig, ports: Ports) -> Self {
        Self {
            manager: RequestManager::new(&config, ports.clone()),
            passive: PassiveLoop::new(config.passive.clone(), ports.clone()),
            presence: PresenceTracker::new(config.presence.clone()),
            router: Router::new(config.name.clone(), config.owner.clone(), ports.clone()),
            inventory: InventoryMonitor::new(),
            vitals: VitalsMonitor::new(),
            deaths: DeathMonitor::new(config.name.clone()),
            timers: TimerQueue::new(),
            reconcile: None,
            announce: None,
            sessions: 0,
            config,
            ports,
        }
    }

    pub fn manager(&self) -> &RequestManager {
        &self.manager
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn passive(&self) -> &PassiveLoop {
        &self.passive
    }

    /// Drives the agent until the input channel closes.
    pub async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        info!(name = %self.config.name, "Agent loop started");
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;

                input = inputs.recv() => match input {
                    Some(input) => self.accept(Instant::now(), input),
                    None => break,
                },

                () = sleep_until(deadline) => self.fire_due(Instant::now()),
            }
        }
        info!("Input channel closed, agent stopped");
    }

    pub fn accept(&mut self, now: Instant, input: Input) {
        match input {
            Input::World(event) => self.handle(now, event),
            Input::StatusQuery(reply) => {
                if reply.send(self.status(now)).is_err() {
                    debug!("Status requester went away");
                }
            }
        }
    }

    /// Reacts to one world event.
    pub fn handle(&mut self, now: Instant, event: WorldEvent) {
        match event {
            WorldEvent::Joined => self.on_join(now),
            WorldEvent::Respawned => {
                info!("Respawned");
                if let Some(position) = self.ports.client.position() {
                    self.presence.on_move(now, position);
                }
                self.manager.on_respawn(now);
            }
            WorldEvent::Died => {
                self.deaths.on_death(&*self.ports.sink);
                self.passive.on_death();
                self.manager.on_death();
            }
            WorldEvent::Disconnected { reason } => {
                warn!(%reason, "Disconnected");
                self.ports.sink.notify(
                    Category::Connection,
                    &format!("🔌 {} disconnected: {reason}", self.config.name),
                );
            }
            WorldEvent::Moved { position } => self.presence.on_move(now, position),
            WorldEvent::GoalReached => {
                debug!("Goal reached");
                self.manager.on_goal_reached(now);
            }
            WorldEvent::Chat { username, message } => self.on_chat(now, &username, &message),
            WorldEvent::SystemMessage { text } => self.on_system_message(&text),
            WorldEvent::HealthChanged { health, food } => {
                self.vitals.observe(health, food, &*self.ports.sink);
            }
            WorldEvent::InventoryChanged { items } => self.on_inventory(&items),
        }
    }

    pub fn status(&self, now: Instant) -> AgentStatus {
        AgentStatus {
            name: self.config.name.clone(),
            position: self.ports.client.position(),
            underground: self.presence.is_underground(),
            circling: self.presence.is_circling(),
            last_surface: self.presence.last_surface(),
            request: self.manager.status(now),
        }
    }

    fn on_join(&mut self, now: Instant) {
        self.sessions += 1;
        if let Some(position) = self.ports.client.position() {
            self.presence.on_join(position);
        }
        self.inventory.seed(&self.ports.client.inventory());

        if self.sessions > 1 {
            info!(sessions = self.sessions, "Rejoined the server");
            self.ports.sink.notify(
                Category::Connection,
                &format!("🔌 {} reconnected", self.config.name),
            );
            self.manager.on_reconnect();
        } else {
            info!("Joined the server");
            self.ports.sink.notify(
                Category::Connection,
                &format!("✅ {} joined the server", self.config.name),
            );
        }

        self.passive.start(now);
        self.start_session(now);
    }

    /// Anti-AFK controls, walking home, announcements and the inventory
    /// reconcile period. Runs on every join.
    fn start_session(&mut self, now: Instant) {
        let session = self.config.session.clone();

        if session.anti_afk.enabled {
            self.passive.hold(Control::Jump);
            if session.anti_afk.sneak {
                self.passive.hold(Control::Sneak);
            }
        }

        if let Some(home) = session.home {
            info!(%home, "Walking home");
            if let Err(e) = self.ports.navigator.set_destination(Goal::near(home, 0.0)) {
                warn!(error = %e, "Home goal rejected");
            }
        }

        if self.reconcile.is_none() {
            self.reconcile = Some(self.timers.schedule(
                now,
                Duration::from_secs(self.config.passive.inventory_reconcile_secs),
                SessionTimer::InventoryReconcile,
            ));
        }

        if let Some(previous) = self.announce.take() {
            self.timers.cancel(previous);
        }
        let announcements = &session.announcements;
        if announcements.enabled && !announcements.messages.is_empty() {
            if announcements.repeat {
                self.announce = Some(self.timers.schedule(
                    now,
                    Duration::from_secs(announcements.interval_secs),
                    SessionTimer::Announce { index: 0 },
                ));
            } else {
                for message in &announcements.messages {
                    self.ports.say(message);
                }
            }
        }
    }

    fn on_chat(&mut self, now: Instant, username: &str, message: &str) {
        if username == self.config.name {
            return;
        }
        let Some(command) = parse(message) else {
            return;
        };
        debug!(username, ?command, "Command");
        let reply = self.router.dispatch(
            now,
            username,
            command,
            &mut self.manager,
            &self.presence,
        );
        self.ports.say(&reply);
    }

    fn on_system_message(&mut self, text: &str) {
        debug!(text, "System message");
        self.deaths.on_system_message(text, &*self.ports.sink);

        if !self.manager.is_active() && is_teleport_request(text) {
            info!("Accepting teleport request");
            self.ports.say("/tpaccept");
        }
    }

    fn on_inventory(&mut self, items: &[ItemStack]) {
        self.inventory.observe(items, &*self.ports.sink);
        self.passive.on_inventory_changed();
    }

    fn fire_session(&mut self, now: Instant) {
        while let Some((timer, kind)) = self.timers.pop_due(now) {
            match kind {
                SessionTimer::InventoryReconcile => {
                    let items = self.ports.client.inventory();
                    let changes = self.inventory.observe(&items, &*self.ports.sink);
                    if changes > 0 {
                        debug!(changes, "Periodic inventory check found changes");
                    }
                    self.reconcile = Some(self.timers.schedule(
                        now,
                        Duration::from_secs(self.config.passive.inventory_reconcile_secs),
                        SessionTimer::InventoryReconcile,
                    ));
                }
                SessionTimer::Announce { index } => {
                    if self.announce != Some(timer) {
                        continue;
                    }
                    let announcements = &self.config.session.announcements;
                    let Some(message) = announcements.messages.get(index) else {
                        self.announce = None;
                        continue;
                    };
                    self.ports.say(message);
                    let next = (index + 1) % announcements.messages.len();
                    self.announce = Some(self.timers.schedule(
                        now,
                        Duration::from_secs(announcements.interval_secs),
                        SessionTimer::Announce { index: next },
                    ));
                }
            }
        }
    }
}

impl Scheduled for Agent {
    fn next_deadline(&self) -> Option<Instant> {
        [
            self.manager.next_deadline(),
            self.passive.next_deadline(),
            self.timers.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn fire_due(&mut self, now: Instant) {
        self.manager.fire_due(now);
        let request_active = self.manager.is_active();
        self.passive
            .fire_due(now, &mut self.presence, request_active);
        self.fire_session(now);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
