//! Collaborator traits for the game session.
//!
//! The agent never speaks the wire protocol itself. A `GameClient` exposes
//! the handful of queries and actions the behaviours need, and a `Navigator`
//! accepts fire-and-forget destinations whose arrival is reported later as
//! [`crate::WorldEvent::GoalReached`].

use crate::{Position, Result};
use serde::{Deserialize, Serialize};

/// A navigation goal: get within `radius` of `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub target: Position,
    pub radius: f64,
}

impl Goal {
    pub fn near(target: Position, radius: f64) -> Self {
        Self { target, radius }
    }
}

/// Drives movement asynchronously.
pub trait Navigator: Send + Sync {
    /// Replaces the current goal. Arrival is signalled later; failure to
    /// accept the goal is a transport error.
    fn set_destination(&self, goal: Goal) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Mob,
    Player,
    Other,
}

/// Something visible in the world around the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
}

/// Movement control toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Jump,
    Sprint,
    Sneak,
}

/// An inventory slot's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Registry name, e.g. `splash_potion`.
    pub name: String,
    /// Human readable name, e.g. `Splash Potion of Swiftness (speed)`.
    pub display_name: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            count,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorSlot {
    Head,
    Torso,
    Legs,
    Feet,
}

impl ArmorSlot {
    pub const ALL: [ArmorSlot; 4] = [
        ArmorSlot::Head,
        ArmorSlot::Torso,
        ArmorSlot::Legs,
        ArmorSlot::Feet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArmorSlot::Head => "head",
            ArmorSlot::Torso => "torso",
            ArmorSlot::Legs => "legs",
            ArmorSlot::Feet => "feet",
        }
    }
}

impl std::fmt::Display for ArmorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The live game session as seen by the agent.
pub trait GameClient: Send + Sync {
    /// The agent's own position, if it currently has a body.
    fn position(&self) -> Option<Position>;

    /// Position of another player, if that player is loaded nearby.
    fn player_position(&self, username: &str) -> Option<Position>;

    /// Sends a chat line. Server commands (`/tp`, `/give`) travel this way too.
    fn chat(&self, text: &str) -> Result<()>;

    fn entities(&self) -> Vec<Entity>;

    /// Whether the agent's feet are in water.
    fn is_submerged(&self) -> bool;

    fn set_control(&self, control: Control, active: bool);

    fn inventory(&self) -> Vec<ItemStack>;

    /// Name of the item currently worn in `slot`.
    fn equipped(&self, slot: ArmorSlot) -> Option<String>;

    fn equip(&self, item: &str, slot: ArmorSlot) -> Result<()>;

    /// Drinks or eats the item.
    fn consume(&self, item: &ItemStack) -> Result<()>;

    /// Uses the held item (throws splash potions).
    fn activate(&self, item: &ItemStack) -> Result<()>;
}
