//! Resource kinds and their gathering cost.

use serde::{Deserialize, Serialize};

/// Base units in one stack.
pub const STACK_SIZE: u32 = 64;

/// Item ids ending in one of these are wood (`oak_log`, `wood_log`,
/// `birch_planks`, `stripped_spruce_wood`).
const WOOD_SUFFIXES: &[&str] = &["_log", "_planks", "_wood"];

const WOOD: &[&str] = &["log", "planks", "wood"];

/// Natural stone names. Each also matches as the last `_`-separated part of
/// an id (`mossy_cobblestone`, `polished_granite`) but not inside a word, so
/// `redstone` stays out.
const STONE: &[&str] = &[
    "stone",
    "cobblestone",
    "andesite",
    "diorite",
    "granite",
    "deepslate",
    "tuff",
    "calcite",
    "blackstone",
];

/// Gathering-cost family of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    Wood,
    Stone,
    Other,
}

impl ResourceFamily {
    /// Minutes of simulated gathering per stack.
    pub fn minutes_per_stack(self) -> u32 {
        match self {
            ResourceFamily::Wood => 3,
            ResourceFamily::Stone => 5,
            ResourceFamily::Other => 15,
        }
    }
}

/// Identifier of the item class a player asked for (e.g. `oak_log`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(String);

impl ResourceKind {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> ResourceFamily {
        let id = self.0.as_str();
        if WOOD.contains(&id) || WOOD_SUFFIXES.iter().any(|suffix| id.ends_with(suffix)) {
            return ResourceFamily::Wood;
        }
        let last = id.rsplit('_').next().unwrap_or(id);
        if id.starts_with("stone_") || STONE.contains(&last) {
            ResourceFamily::Stone
        } else {
            ResourceFamily::Other
        }
    }

    pub fn minutes_per_stack(&self) -> u32 {
        self.family().minutes_per_stack()
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
