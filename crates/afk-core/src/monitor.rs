//! Inventory, vitals and death monitors.
//!
//! Each monitor turns world signals into notifications. None of them
//! affects request state.

use crate::notify::stamped;
use afk_proto::{Category, ItemStack, NotificationSink};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A per-item count change between two inventory snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryChange {
    Added { item: String, count: u32 },
    Removed { item: String, count: u32 },
}

impl InventoryChange {
    pub fn message(&self) -> String {
        match self {
            InventoryChange::Added { item, count } => {
                format!("📦 **Inventory Update**\n➕ Added: {item} {count}")
            }
            InventoryChange::Removed { item, count } => {
                format!("📦 **Inventory Update**\n➖ Removed: {item} {count}")
            }
        }
    }
}

/// Tracks `{item -> count}` and reports what changed.
#[derive(Debug, Default)]
pub struct InventoryMonitor {
    previous: BTreeMap<String, u32>,
}

fn tally(items: &[ItemStack]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.name.clone()).or_insert(0) += item.count;
    }
    counts
}

impl InventoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot without reporting anything.
    pub fn seed(&mut self, items: &[ItemStack]) {
        self.previous = tally(items);
    }

    /// Diffs `items` against the snapshot and makes them the new snapshot.
    /// Counts in the result are the new totals.
    pub fn diff(&mut self, items: &[ItemStack]) -> Vec<InventoryChange> {
        let current = tally(items);
        let mut changes = Vec::new();

        for (item, &count) in &current {
            if count > self.previous.get(item).copied().unwrap_or(0) {
                changes.push(InventoryChange::Added {
                    item: item.clone(),
                    count,
                });
            }
        }
        for (item, &before) in &self.previous {
            let count = current.get(item).copied().unwrap_or(0);
            if count < before {
                changes.push(InventoryChange::Removed {
                    item: item.clone(),
                    count,
                });
            }
        }

        self.previous = current;
        changes
    }

    /// Diffs and sends one `inventory` notification per change.
    pub fn observe(&mut self, items: &[ItemStack], sink: &dyn NotificationSink) -> usize {
        let changes = self.diff(items);
        for change in &changes {
            info!(?change, "Inventory changed");
            sink.notify(Category::Inventory, &stamped(&change.message()));
        }
        changes.len()
    }
}

/// Reports health and food changes.
#[derive(Debug, Default)]
pub struct VitalsMonitor {
    previous: Option<(f32, u32)>,
}

impl VitalsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, health: f32, food: u32) {
        self.previous = Some((health, food));
    }

    /// Returns true if a notification was sent.
    pub fn observe(&mut self, health: f32, food: u32, sink: &dyn NotificationSink) -> bool {
        let changed = self.previous.is_none_or(|(h, f)| {
            (h - health).abs() > f32::EPSILON || f != food
        });
        if !changed {
            return false;
        }
        self.previous = Some((health, food));
        debug!(health, food, "Vitals changed");
        sink.notify(
            Category::Health,
            &stamped(&format!("Health: {health}\nHunger: {food}")),
        );
        true
    }
}

/// Announces deaths and captures the reason from the next system message.
#[derive(Debug)]
pub struct DeathMonitor {
    name: String,
    awaiting_reason: bool,
    last_reason: Option<String>,
}

impl DeathMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            awaiting_reason: false,
            last_reason: None,
        }
    }

    pub fn on_death(&mut self, sink: &dyn NotificationSink) {
        info!("Agent died");
        self.awaiting_reason = true;
        sink.notify(Category::Death, &format!("💀 {} died", self.name));
    }

    /// Returns true if `text` was taken as the death reason.
    pub fn on_system_message(&mut self, text: &str, sink: &dyn NotificationSink) -> bool {
        if !self.awaiting_reason {
            return false;
        }
        self.awaiting_reason = false;
        info!(reason = text, "Death reason");
        sink.notify(Category::Death, &format!("💀 {} died: {text}", self.name));
        self.last_reason = Some(text.to_string());
        true
    }

    pub fn last_reason(&self) -> Option<&str> {
        self.last_reason.as_deref()
    }
}

/// Whether a system message is an incoming teleport request.
pub fn is_teleport_request(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("[simpletpa]") && text.contains("has sent you a teleport request")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[test]
    fn test_inventory_diff_reports_added_and_removed() {
        let mut monitor = InventoryMonitor::new();
        monitor.seed(&[ItemStack::new("bread", 5), ItemStack::new("torch", 10)]);

        let changes = monitor.diff(&[
            ItemStack::new("bread", 3),
            ItemStack::new("oak_log", 64),
            ItemStack::new("oak_log", 64),
        ]);
        assert_eq!(
            changes,
            vec![
                InventoryChange::Added {
                    item: "oak_log".to_string(),
                    count: 128
                },
                InventoryChange::Removed {
                    item: "bread".to_string(),
                    count: 3
                },
                InventoryChange::Removed {
                    item: "torch".to_string(),
                    count: 0
                },
            ]
        );
        assert!(monitor.diff(&[ItemStack::new("bread", 3), ItemStack::new("oak_log", 128)]).is_empty());
    }

    #[test]
    fn test_inventory_notifications_are_stamped() {
        let sink = RecordingSink::new();
        let mut monitor = InventoryMonitor::new();
        assert_eq!(monitor.observe(&[ItemStack::new("stone", 64)], &sink), 1);

        let texts = sink.texts(Category::Inventory);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("-----("));
        assert!(texts[0].contains("➕ Added: stone 64"));
    }

    #[test]
    fn test_vitals_only_report_changes() {
        let sink = RecordingSink::new();
        let mut vitals = VitalsMonitor::new();
        vitals.seed(20.0, 20);
        assert!(!vitals.observe(20.0, 20, &sink));
        assert!(vitals.observe(14.5, 20, &sink));
        assert!(vitals.observe(14.5, 17, &sink));

        let texts = sink.texts(Category::Health);
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("Health: 14.5\nHunger: 17"));
    }

    #[test]
    fn test_death_reason_is_the_next_system_message() {
        let sink = RecordingSink::new();
        let mut deaths = DeathMonitor::new("AFKBot");
        assert!(!deaths.on_system_message("Welcome!", &sink));

        deaths.on_death(&sink);
        assert!(deaths.on_system_message("AFKBot was blown up by Creeper", &sink));
        assert!(!deaths.on_system_message("Player joined", &sink));

        assert_eq!(
            sink.texts(Category::Death),
            vec!["💀 AFKBot died", "💀 AFKBot died: AFKBot was blown up by Creeper"]
        );
        assert_eq!(deaths.last_reason(), Some("AFKBot was blown up by Creeper"));
    }

    #[test]
    fn test_teleport_request_detection_is_case_insensitive() {
        assert!(is_teleport_request(
            "[SimpleTPA] alice has sent you a teleport request"
        ));
        assert!(!is_teleport_request("alice has sent you a teleport request"));
        assert!(!is_teleport_request("[simpletpa] request expired"));
    }
}
