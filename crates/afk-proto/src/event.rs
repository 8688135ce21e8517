//! Signals raised by the game session.

use crate::{ItemStack, Position};
use serde::{Deserialize, Serialize};

/// Everything the session can tell the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world: first join or a reconnection.
    Joined,
    /// The agent came back to life after dying.
    Respawned,
    Died,
    /// The session dropped. In-process state survives.
    Disconnected { reason: String },
    Moved { position: Position },
    /// The navigator reached its current goal.
    GoalReached,
    /// A player chat line.
    Chat { username: String, message: String },
    /// A server/system message.
    SystemMessage { text: String },
    HealthChanged { health: f32, food: u32 },
    InventoryChanged { items: Vec<ItemStack> },
}

impl WorldEvent {
    pub fn chat(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chat {
            username: username.into(),
            message: message.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::SystemMessage { text: text.into() }
    }

    pub fn moved(position: Position) -> Self {
        Self::Moved { position }
    }
}
