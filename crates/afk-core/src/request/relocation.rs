//! Bounded-retry relocation to a player, with rally-point fallback.
//!
//! Relocation is a teleport command followed by position polling: the move
//! counts as done once the agent has been displaced by more than the
//! configured threshold. A failed send is re-issued on the next poll. When
//! the attempt ceiling is reached, or the target cannot be located at all,
//! the agent is sent to the rally point instead.

use crate::config::RelocationConfig;
use afk_proto::{Error, GameClient, Position};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a relocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// The agent reached the target player.
    Arrived,
    /// The agent was sent to the rally point.
    FellBack,
}

impl std::fmt::Display for RelocationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelocationOutcome::Arrived => f.write_str("arrived"),
            RelocationOutcome::FellBack => f.write_str("rally point"),
        }
    }
}

/// An in-flight relocation.
#[derive(Debug, Clone)]
pub(crate) struct Relocation {
    pub target: String,
    /// Where the agent stood when the teleport was issued.
    pub start: Option<Position>,
    pub attempts: u32,
    /// Whether the teleport command went out successfully.
    pub issued: bool,
}

pub(crate) enum Started {
    Settled(RelocationOutcome),
    Pending(Relocation),
}

/// Issues and confirms relocations.
pub struct Relocator {
    client: Arc<dyn GameClient>,
    config: RelocationConfig,
}

impl Relocator {
    pub fn new(client: Arc<dyn GameClient>, config: RelocationConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RelocationConfig {
        &self.config
    }

    /// Starts moving toward `target`. Settles immediately when the target
    /// cannot be located.
    pub(crate) fn start(&self, target: &str) -> Started {
        if self.client.player_position(target).is_none() {
            info!(player = target, "Player not found, heading to rally point");
            self.rally();
            return Started::Settled(RelocationOutcome::FellBack);
        }

        let mut relocation = Relocation {
            target: target.to_string(),
            start: self.client.position(),
            attempts: 0,
            issued: false,
        };
        self.issue(&mut relocation);
        Started::Pending(relocation)
    }

    /// One polling step. `None` means keep polling.
    pub(crate) fn poll(&self, relocation: &mut Relocation) -> Option<RelocationOutcome> {
        relocation.attempts += 1;

        if relocation.issued && self.displaced(relocation) {
            info!(
                player = %relocation.target,
                attempts = relocation.attempts,
                "Relocation confirmed"
            );
            return Some(RelocationOutcome::Arrived);
        }

        if relocation.attempts >= self.config.max_attempts {
            let timeout = Error::RelocationTimeout {
                target: relocation.target.clone(),
                attempts: relocation.attempts,
            };
            warn!("{timeout}; falling back to rally point");
            self.rally();
            return Some(RelocationOutcome::FellBack);
        }

        if !relocation.issued {
            self.issue(relocation);
        }
        None
    }

    /// Sends the agent to the rally point. Failures are logged only.
    pub fn rally(&self) {
        if let Err(e) = self.client.chat(&self.config.rally_command) {
            warn!(error = %e, "Rally command failed");
        }
    }

    fn issue(&self, relocation: &mut Relocation) {
        match self.client.chat(&format!("/tp {}", relocation.target)) {
            Ok(()) => {
                debug!(player = %relocation.target, "Teleport issued");
                relocation.issued = true;
            }
            Err(e) => {
                warn!(player = %relocation.target, error = %e, "Teleport send failed, will retry");
            }
        }
    }

    fn displaced(&self, relocation: &Relocation) -> bool {
        match (relocation.start, self.client.position()) {
            (Some(start), Some(now)) => start.distance(&now) > self.config.displacement_threshold,
            // No baseline: any position after a successful send counts.
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}
