//! Status-effect upkeep from potions in the inventory.

use afk_proto::{GameClient, ItemStack};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Remembers which effects are active and until when.
#[derive(Debug)]
pub struct EffectTracker {
    duration: Duration,
    active: HashMap<String, Instant>,
}

impl EffectTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: HashMap::new(),
        }
    }

    pub fn is_active(&self, effect: &str, now: Instant) -> bool {
        self.active.get(effect).is_some_and(|until| now <= *until)
    }

    /// Reapplies every expired or missing effect in `wanted`. Returns the
    /// effects applied on this call.
    pub fn maintain(
        &mut self,
        now: Instant,
        client: &dyn GameClient,
        wanted: &[String],
    ) -> Vec<String> {
        self.active.retain(|_, until| now <= *until);

        let mut applied = Vec::new();
        let mut inventory = client.inventory();
        for effect in wanted {
            if self.active.contains_key(effect) {
                continue;
            }
            let Some(index) = find_potion(&inventory, effect) else {
                continue;
            };
            let potion = inventory.remove(index);
            if apply(client, &potion) {
                info!(effect = %effect, potion = %potion.display_name, "Applied potion");
                self.active.insert(effect.clone(), now + self.duration);
                applied.push(effect.clone());
            }
        }
        applied
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

fn find_potion(inventory: &[ItemStack], effect: &str) -> Option<usize> {
    inventory.iter().position(|item| {
        item.name.contains("potion") && item.display_name.to_lowercase().contains(effect)
    })
}

fn apply(client: &dyn GameClient, potion: &ItemStack) -> bool {
    let result = if potion.name.contains("splash") {
        debug!(potion = %potion.display_name, "Throwing splash potion");
        client.activate(potion)
    } else {
        debug!(potion = %potion.display_name, "Drinking potion");
        client.consume(potion)
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(potion = %potion.display_name, error = %e, "Potion use failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingWorld;
    use afk_proto::Position;

    fn wanted(effects: &[&str]) -> Vec<String> {
        effects.iter().map(|e| (*e).to_string()).collect()
    }

    fn world_with(items: Vec<ItemStack>) -> RecordingWorld {
        let world = RecordingWorld::at(Position::new(0.0, 64.0, 0.0));
        world.set_inventory(items);
        world
    }

    #[test]
    fn test_drinks_and_throws_matching_potions() {
        let world = world_with(vec![
            ItemStack::new("potion", 1).with_display_name("Potion of speed"),
            ItemStack::new("splash_potion", 1).with_display_name("Splash Potion of strength"),
            ItemStack::new("bread", 5),
        ]);
        let mut effects = EffectTracker::new(Duration::from_secs(180));
        let now = Instant::now();

        let applied = effects.maintain(now, &world, &wanted(&["speed", "strength", "night_vision"]));
        assert_eq!(applied, vec!["speed", "strength"]);
        assert_eq!(world.consumed(), vec!["Potion of speed"]);
        assert_eq!(world.activated(), vec!["Splash Potion of strength"]);
        assert!(effects.is_active("speed", now));
        assert!(!effects.is_active("night_vision", now));
    }

    #[test]
    fn test_effect_is_reapplied_only_after_expiry() {
        let world = world_with(vec![
            ItemStack::new("potion", 3).with_display_name("Potion of regeneration"),
        ]);
        let mut effects = EffectTracker::new(Duration::from_secs(180));
        let start = Instant::now();
        let regen = wanted(&["regeneration"]);

        assert_eq!(effects.maintain(start, &world, &regen).len(), 1);
        assert!(effects.maintain(start + Duration::from_secs(180), &world, &regen).is_empty());
        assert_eq!(
            effects
                .maintain(start + Duration::from_secs(181), &world, &regen)
                .len(),
            1
        );
        assert_eq!(world.consumed().len(), 2);
    }

    #[test]
    fn test_missing_potion_is_not_marked_active() {
        let world = world_with(Vec::new());
        let mut effects = EffectTracker::new(Duration::from_secs(180));
        let now = Instant::now();
        assert!(effects.maintain(now, &world, &wanted(&["speed"])).is_empty());
        assert!(!effects.is_active("speed", now));
    }
}
