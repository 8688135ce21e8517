//! Agent configuration.
//!
//! Loaded from a YAML file (`afkbot.yml` by convention). Every section has
//! defaults, so an empty document is a valid configuration.

use afk_proto::{Category, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name used in notifications.
    pub name: String,
    /// Player allowed to run privileged commands (`!setspawn`).
    pub owner: Option<String>,
    /// Seed for wander/travel headings. Random when unset.
    pub seed: Option<u64>,
    pub request: RequestConfig,
    pub relocation: RelocationConfig,
    pub passive: PassiveConfig,
    pub presence: PresenceConfig,
    pub notifications: NotificationsConfig,
    pub session: SessionConfig,
    pub sim: SimConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "AFKBot".to_string(),
            owner: None,
            seed: None,
            request: RequestConfig::default(),
            relocation: RelocationConfig::default(),
            passive: PassiveConfig::default(),
            presence: PresenceConfig::default(),
            notifications: NotificationsConfig::default(),
            session: SessionConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document; treat it as "all defaults".
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wander = &self.request.wander;
        if wander.min_distance > wander.max_distance {
            return Err(ConfigError::Invalid(format!(
                "request.wander.min_distance ({}) exceeds max_distance ({})",
                wander.min_distance, wander.max_distance
            )));
        }
        if wander.min_interval_secs > wander.max_interval_secs {
            return Err(ConfigError::Invalid(format!(
                "request.wander.min_interval_secs ({}) exceeds max_interval_secs ({})",
                wander.min_interval_secs, wander.max_interval_secs
            )));
        }
        if wander.min_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "request.wander.min_interval_secs must be positive".to_string(),
            ));
        }
        if self.request.progress_interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "request.progress_interval_minutes must be positive".to_string(),
            ));
        }
        if self.relocation.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "relocation.max_attempts must be positive".to_string(),
            ));
        }
        if self.relocation.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "relocation.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.passive.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "passive.tick_ms must be positive".to_string(),
            ));
        }
        for (field, value) in [
            ("passive.armor_interval_secs", self.passive.armor_interval_secs),
            (
                "passive.inventory_reconcile_secs",
                self.passive.inventory_reconcile_secs,
            ),
            (
                "session.announcements.interval_secs",
                self.session.announcements.interval_secs,
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be positive")));
            }
        }
        Ok(())
    }
}

/// Request lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// How far the outward trip goes before wandering starts.
    pub travel_distance: f64,
    pub travel_radius: f64,
    pub progress_interval_minutes: u32,
    /// Lead time of the "nearly done" ping before completion.
    pub near_completion_lead_minutes: u32,
    pub wander: WanderConfig,
    pub cloak: CloakConfig,
    /// Said after delivery so the requester knows how to collect.
    pub drop_message: String,
    /// Said on reconnection while a request is in flight.
    pub recovery_message: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            travel_distance: 1000.0,
            travel_radius: 3.0,
            progress_interval_minutes: 10,
            near_completion_lead_minutes: 5,
            wander: WanderConfig::default(),
            cloak: CloakConfig::default(),
            drop_message: "kill me so the item will drop".to_string(),
            recovery_message: "restart me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub radius: f64,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            min_distance: 100.0,
            max_distance: 200.0,
            min_interval_secs: 10,
            max_interval_secs: 20,
            radius: 3.0,
        }
    }
}

/// Effects applied shortly after a request is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloakConfig {
    pub delay_secs: u64,
    pub commands: Vec<String>,
    pub announcement: Option<String>,
}

impl Default for CloakConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10,
            commands: vec![
                "/effect give @s minecraft:invisibility 60 99 false".to_string(),
                "/effect give @s minecraft:saturation infinite 99 true".to_string(),
            ],
            announcement: Some("INVISIBLE: off gathering, nobody can see me".to_string()),
        }
    }
}

/// Bounded-retry relocation used by delivery and cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    /// Displacement that counts as "the teleport happened".
    pub displacement_threshold: f64,
    /// Command that sends the agent to the rally point.
    pub rally_command: String,
}

impl RelocationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 10,
            displacement_threshold: 2.0,
            rally_command: "/spawn".to_string(),
        }
    }
}

/// Passive survival loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveConfig {
    pub tick_ms: u64,
    pub effects: Vec<String>,
    pub effect_duration_secs: u64,
    /// Effects are only maintained while the agent moved this recently.
    pub motion_window_secs: u64,
    pub threat_radius: f64,
    pub flee_distance: f64,
    pub flee_radius: f64,
    pub flee_burst_secs: u64,
    pub swim_burst_secs: u64,
    pub hostiles: Vec<String>,
    pub armor_interval_secs: u64,
    pub inventory_reconcile_secs: u64,
}

impl PassiveConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for PassiveConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            tick_ms: 1000,
            effects: strings(&[
                "speed",
                "strength",
                "regeneration",
                "jump_boost",
                "fire_resistance",
                "water_breathing",
                "night_vision",
            ]),
            effect_duration_secs: 180,
            motion_window_secs: 5,
            threat_radius: 16.0,
            flee_distance: 20.0,
            flee_radius: 5.0,
            flee_burst_secs: 3,
            swim_burst_secs: 5,
            hostiles: strings(&[
                "creeper",
                "skeleton",
                "zombie",
                "spider",
                "enderman",
                "witch",
                "blaze",
                "ghast",
                "magma_cube",
                "slime",
                "guardian",
                "elder_guardian",
                "wither_skeleton",
                "stray",
                "husk",
                "drowned",
                "phantom",
                "ravager",
                "piglin_brute",
                "warden",
            ]),
            armor_interval_secs: 60,
            inventory_reconcile_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Elevation below which the agent counts as underground.
    pub underground_below: f64,
    /// Number of passive-tick samples used for circling detection.
    pub circle_window: usize,
    pub circle_radius: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            underground_below: 40.0,
            circle_window: 10,
            circle_radius: 5.0,
        }
    }
}

/// Webhook routing. A category without its own URL uses the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub default_webhook: Option<String>,
    pub webhooks: HashMap<Category, String>,
}

impl NotificationsConfig {
    pub fn url_for(&self, category: Category) -> Option<&str> {
        self.webhooks
            .get(&category)
            .or(self.default_webhook.as_ref())
            .map(String::as_str)
    }
}

/// What to do every time the agent (re)joins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub anti_afk: AntiAfkConfig,
    /// Walk here after joining.
    pub home: Option<Position>,
    pub announcements: AnnouncementsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiAfkConfig {
    pub enabled: bool,
    pub sneak: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementsConfig {
    pub enabled: bool,
    /// Cycle through `messages` forever instead of saying them once.
    pub repeat: bool,
    pub interval_secs: u64,
    pub messages: Vec<String>,
}

impl Default for AnnouncementsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repeat: false,
            interval_secs: 60,
            messages: Vec::new(),
        }
    }
}

/// Settings for the simulated world used by dry runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Travel speed in blocks per second.
    pub speed: f64,
    pub spawn: Position,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            spawn: Position::new(0.0, 64.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        let config = AgentConfig::from_yaml("").unwrap();
        assert_eq!(config.name, "AFKBot");
        assert!((config.request.travel_distance - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.relocation.max_attempts, 10);
        assert_eq!(config.passive.effects.len(), 7);
        assert_eq!(config.passive.hostiles.len(), 20);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = r#"
owner: woopsyy69
request:
  travel_distance: 250
  wander:
    min_interval_secs: 5
relocation:
  rally_command: "/warp hub"
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.owner.as_deref(), Some("woopsyy69"));
        assert!((config.request.travel_distance - 250.0).abs() < f64::EPSILON);
        assert_eq!(config.request.wander.min_interval_secs, 5);
        assert_eq!(config.request.wander.max_interval_secs, 20);
        assert_eq!(config.relocation.rally_command, "/warp hub");
        assert_eq!(config.relocation.poll_interval_ms, 1000);
    }

    #[test]
    fn test_webhook_routing_falls_back_to_default() {
        let yaml = r#"
notifications:
  default_webhook: "https://hooks.example/general"
  webhooks:
    death: "https://hooks.example/death"
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.notifications.url_for(Category::Death),
            Some("https://hooks.example/death")
        );
        assert_eq!(
            config.notifications.url_for(Category::Inventory),
            Some("https://hooks.example/general")
        );
    }

    #[test]
    fn test_invalid_wander_range_rejected() {
        let yaml = r#"
request:
  wander:
    min_distance: 300
    max_distance: 200
"#;
        let err = AgentConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: Gatherer\nseed: 7").unwrap();
        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.name, "Gatherer");
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AgentConfig::from_file("/definitely/not/here/afkbot.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
