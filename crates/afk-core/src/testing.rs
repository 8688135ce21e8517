//! Recording fakes for the external collaborators.
//!
//! `RecordingWorld` plays both the game session and the navigator: it keeps
//! a scripted world (own position, other players, entities, inventory) and
//! records every chat line, goal and control toggle the agent produces.
//! `RecordingSink` records notifications. Neither does any I/O, so tests can
//! drive the agent with a manual clock.

use afk_proto::{
    ArmorSlot, Category, Control, Entity, EntityKind, Error, GameClient, Goal, ItemStack,
    Navigator, NotificationSink, Position, Result,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where `/spawn` puts the agent.
pub const RALLY_POINT: Position = Position::new(0.0, 64.0, 0.0);

#[derive(Debug, Default)]
struct WorldState {
    position: Option<Position>,
    players: HashMap<String, Position>,
    chat: Vec<String>,
    goals: Vec<Goal>,
    entities: Vec<Entity>,
    submerged: bool,
    controls: HashMap<Control, bool>,
    control_log: Vec<(Control, bool)>,
    inventory: Vec<ItemStack>,
    equipped: HashMap<ArmorSlot, String>,
    consumed: Vec<String>,
    activated: Vec<String>,
    failing_chats: u32,
    failing_goals: u32,
    teleports_frozen: bool,
}

/// Scripted game session and navigator.
#[derive(Debug, Default)]
pub struct RecordingWorld {
    state: Mutex<WorldState>,
}

impl RecordingWorld {
    /// A world where the agent stands at `position`.
    pub fn at(position: Position) -> Self {
        let world = Self::default();
        world.state().position = Some(position);
        world
    }

    /// A world where the agent has no body yet.
    pub fn without_body() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_player(self, name: &str, position: Position) -> Self {
        self.set_player(name, position);
        self
    }

    fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_position(&self, position: Position) {
        self.state().position = Some(position);
    }

    pub fn set_player(&self, name: &str, position: Position) {
        self.state().players.insert(name.to_string(), position);
    }

    pub fn remove_player(&self, name: &str) {
        self.state().players.remove(name);
    }

    /// Adds a mob at `position`.
    pub fn spawn_mob(&self, name: &str, position: Position) {
        self.state().entities.push(Entity {
            name: name.to_string(),
            kind: EntityKind::Mob,
            position,
        });
    }

    pub fn clear_entities(&self) {
        self.state().entities.clear();
    }

    pub fn set_submerged(&self, submerged: bool) {
        self.state().submerged = submerged;
    }

    pub fn set_inventory(&self, items: Vec<ItemStack>) {
        self.state().inventory = items;
    }

    pub fn set_equipped(&self, slot: ArmorSlot, item: &str) {
        self.state().equipped.insert(slot, item.to_string());
    }

    /// `/tp` lines are recorded but no longer move the agent.
    pub fn freeze_teleports(&self) {
        self.state().teleports_frozen = true;
    }

    pub fn unfreeze_teleports(&self) {
        self.state().teleports_frozen = false;
    }

    /// The next `n` chat sends fail with a transport error and are not
    /// recorded.
    pub fn fail_next_chats(&self, n: u32) {
        self.state().failing_chats = n;
    }

    /// The next `n` navigation goals are rejected.
    pub fn fail_next_goals(&self, n: u32) {
        self.state().failing_goals = n;
    }

    pub fn chat_log(&self) -> Vec<String> {
        self.state().chat.clone()
    }

    /// Chat lines sent since the last call.
    pub fn take_chat(&self) -> Vec<String> {
        std::mem::take(&mut self.state().chat)
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.state().goals.clone()
    }

    pub fn last_goal(&self) -> Option<Goal> {
        self.state().goals.last().copied()
    }

    pub fn control(&self, control: Control) -> bool {
        self.state().controls.get(&control).copied().unwrap_or(false)
    }

    pub fn control_log(&self) -> Vec<(Control, bool)> {
        self.state().control_log.clone()
    }

    pub fn consumed(&self) -> Vec<String> {
        self.state().consumed.clone()
    }

    pub fn activated(&self) -> Vec<String> {
        self.state().activated.clone()
    }

    fn use_up(state: &mut WorldState, item: &ItemStack) {
        if let Some(index) = state
            .inventory
            .iter()
            .position(|held| held.display_name == item.display_name)
        {
            let held = &mut state.inventory[index];
            held.count = held.count.saturating_sub(1);
            if held.count == 0 {
                state.inventory.remove(index);
            }
        }
    }
}

impl GameClient for RecordingWorld {
    fn position(&self) -> Option<Position> {
        self.state().position
    }

    fn player_position(&self, username: &str) -> Option<Position> {
        self.state().players.get(username).copied()
    }

    fn chat(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        if state.failing_chats > 0 {
            state.failing_chats -= 1;
            return Err(Error::transport("chat channel closed"));
        }
        state.chat.push(text.to_string());

        if text == "/spawn" {
            state.position = Some(RALLY_POINT);
        } else if let Some(target) = text.strip_prefix("/tp ") {
            if !state.teleports_frozen {
                if let Some(destination) = state.players.get(target.trim()).copied() {
                    state.position = Some(destination);
                }
            }
        }
        Ok(())
    }

    fn entities(&self) -> Vec<Entity> {
        self.state().entities.clone()
    }

    fn is_submerged(&self) -> bool {
        self.state().submerged
    }

    fn set_control(&self, control: Control, active: bool) {
        let mut state = self.state();
        state.controls.insert(control, active);
        state.control_log.push((control, active));
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.state().inventory.clone()
    }

    fn equipped(&self, slot: ArmorSlot) -> Option<String> {
        self.state().equipped.get(&slot).cloned()
    }

    fn equip(&self, item: &str, slot: ArmorSlot) -> Result<()> {
        self.state().equipped.insert(slot, item.to_string());
        Ok(())
    }

    fn consume(&self, item: &ItemStack) -> Result<()> {
        let mut state = self.state();
        state.consumed.push(item.display_name.clone());
        Self::use_up(&mut state, item);
        Ok(())
    }

    fn activate(&self, item: &ItemStack) -> Result<()> {
        let mut state = self.state();
        state.activated.push(item.display_name.clone());
        Self::use_up(&mut state, item);
        Ok(())
    }
}

impl Navigator for RecordingWorld {
    fn set_destination(&self, goal: Goal) -> Result<()> {
        let mut state = self.state();
        if state.failing_goals > 0 {
            state.failing_goals -= 1;
            return Err(Error::transport("navigator unavailable"));
        }
        state.goals.push(goal);
        Ok(())
    }
}

/// Records notifications in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(Category, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn messages_mut(&self) -> MutexGuard<'_, Vec<(Category, String)>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messages(&self) -> Vec<(Category, String)> {
        self.messages_mut().clone()
    }

    /// Texts sent to `category`.
    pub fn texts(&self, category: Category) -> Vec<String> {
        self.messages_mut()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn count(&self, category: Category) -> usize {
        self.messages_mut()
            .iter()
            .filter(|(c, _)| *c == category)
            .count()
    }

    /// Number of notifications whose text contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages_mut()
            .iter()
            .filter(|(_, text)| text.contains(needle))
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count_containing(needle) > 0
    }

    pub fn clear(&self) {
        self.messages_mut().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, category: Category, text: &str) {
        self.messages_mut().push((category, text.to_string()));
    }
}
