//! Presence Tracker: where the agent is, whether it is underground, when it
//! last moved, and whether it has been going round in circles.

use crate::config::PresenceConfig;
use afk_proto::{Goal, Navigator, Position};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Approach radius when surfacing toward the last surface position.
const ESCAPE_RADIUS: f64 = 5.0;

/// Minimum displacement that counts as movement.
const MOVE_EPSILON: f64 = 0.01;

#[derive(Debug)]
pub struct PresenceTracker {
    config: PresenceConfig,
    position: Option<Position>,
    last_surface: Option<Position>,
    last_movement: Option<Instant>,
    history: VecDeque<Position>,
    circling: bool,
}

impl PresenceTracker {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            position: None,
            last_surface: None,
            last_movement: None,
            history: VecDeque::new(),
            circling: false,
        }
    }

    /// Records a movement signal.
    pub fn on_move(&mut self, now: Instant, position: Position) {
        let moved = self
            .position
            .is_none_or(|previous| previous.distance(&position) > MOVE_EPSILON);
        if moved {
            self.last_movement = Some(now);
        }
        self.position = Some(position);
        if !self.is_below_surface(&position) {
            self.last_surface = Some(position);
        }
    }

    /// Seeds the tracker on (re)join. An underground spawn leaves the last
    /// surface position untouched.
    pub fn on_join(&mut self, position: Position) {
        self.position = Some(position);
        if !self.is_below_surface(&position) {
            self.last_surface = Some(position);
        }
        self.history.clear();
        self.circling = false;
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn last_surface(&self) -> Option<Position> {
        self.last_surface
    }

    pub fn is_below_surface(&self, position: &Position) -> bool {
        position.y < self.config.underground_below
    }

    pub fn is_underground(&self) -> bool {
        self.position
            .is_some_and(|position| self.is_below_surface(&position))
    }

    /// Whether a movement signal arrived within `window` before `now`.
    pub fn moved_within(&self, now: Instant, window: Duration) -> bool {
        self.last_movement
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    pub fn is_circling(&self) -> bool {
        self.circling
    }

    /// Takes one position sample for circling detection. Returns true when
    /// circling starts.
    pub fn sample(&mut self) -> bool {
        let Some(position) = self.position else {
            return false;
        };
        let window = self.config.circle_window.max(2);
        self.history.push_back(position);
        while self.history.len() > window {
            self.history.pop_front();
        }
        if self.history.len() < window {
            return false;
        }

        let was_circling = self.circling;
        self.circling = match (self.history.front(), self.history.back()) {
            (Some(first), Some(last)) => {
                first.horizontal_distance(last) < self.config.circle_radius
            }
            _ => false,
        };
        if self.circling && !was_circling {
            info!(%position, "Agent appears to be circling in place");
        }
        self.circling && !was_circling
    }

    /// Heads back toward the last surface position. Returns false, after a
    /// diagnostic, when no surface position has ever been seen.
    pub fn escape(&self, navigator: &dyn Navigator) -> bool {
        let Some(surface) = self.last_surface else {
            warn!("No surface position recorded, cannot escape");
            return false;
        };
        match navigator.set_destination(Goal::near(surface, ESCAPE_RADIUS)) {
            Ok(()) => {
                debug!(%surface, "Escaping to last surface position");
                true
            }
            Err(e) => {
                warn!(error = %e, "Escape goal rejected");
                false
            }
        }
    }
}
