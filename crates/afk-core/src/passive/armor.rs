//! Best-available armor per slot.

use afk_proto::{ArmorSlot, GameClient, ItemStack};
use tracing::{info, warn};

/// Materials from best to worst.
const MATERIALS: [&str; 4] = ["diamond", "iron", "chainmail", "leather"];

fn piece(slot: ArmorSlot) -> &'static str {
    match slot {
        ArmorSlot::Head => "helmet",
        ArmorSlot::Torso => "chestplate",
        ArmorSlot::Legs => "leggings",
        ArmorSlot::Feet => "boots",
    }
}

/// The highest-ranked piece for `slot` found in `inventory`.
pub fn best_for(slot: ArmorSlot, inventory: &[ItemStack]) -> Option<String> {
    MATERIALS
        .iter()
        .map(|material| format!("{material}_{}", piece(slot)))
        .find(|name| inventory.iter().any(|item| item.name == *name))
}

/// Equips the best piece for every slot where it differs from what is worn.
/// Returns what was equipped.
pub fn equip_best(client: &dyn GameClient) -> Vec<(ArmorSlot, String)> {
    let inventory = client.inventory();
    let mut equipped = Vec::new();
    for slot in ArmorSlot::ALL {
        let Some(best) = best_for(slot, &inventory) else {
            continue;
        };
        if client.equipped(slot).as_deref() == Some(best.as_str()) {
            continue;
        }
        match client.equip(&best, slot) {
            Ok(()) => {
                info!(%slot, item = %best, "Equipped armor");
                equipped.push((slot, best));
            }
            Err(e) => warn!(%slot, item = %best, error = %e, "Failed to equip armor"),
        }
    }
    equipped
}
