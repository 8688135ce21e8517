//! An in-process game world for dry runs.
//!
//! `SimWorld` plays the game session and the navigator at once. Travel takes
//! `distance / speed` seconds of wall time on a spawned task; a newer goal
//! supersedes an older one still in flight. A handful of server commands
//! (`/give`, `/tp`, `/spawn`, `/spawnpoint`) are interpreted so the request
//! lifecycle can be exercised end to end. Every signal goes back to the
//! agent as an [`Input::World`] event.

use afk_core::Input;
use afk_core::config::SimConfig;
use afk_proto::{
    ArmorSlot, Control, Entity, EntityKind, Error, GameClient, Goal, ItemStack, Navigator,
    Position, Result, WorldEvent,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SimState {
    position: Position,
    spawn: Position,
    alive: bool,
    players: HashMap<String, Position>,
    entities: Vec<Entity>,
    inventory: Vec<ItemStack>,
    equipped: HashMap<ArmorSlot, String>,
    controls: HashMap<Control, bool>,
    submerged: bool,
    /// Bumped by every new goal; a travel task only lands if it still holds
    /// the current value.
    travel: u64,
}

#[derive(Clone)]
pub struct SimWorld {
    state: Arc<Mutex<SimState>>,
    events: UnboundedSender<Input>,
    speed: f64,
}

impl SimWorld {
    pub fn new(config: &SimConfig, events: UnboundedSender<Input>) -> Self {
        let state = SimState {
            position: config.spawn,
            spawn: config.spawn,
            alive: true,
            ..SimState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            speed: config.speed,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: WorldEvent) {
        if self.events.send(Input::World(event)).is_err() {
            debug!("Agent gone, world event dropped");
        }
    }

    /// Brings the agent into the world.
    pub fn join(&self) {
        self.emit(WorldEvent::Joined);
    }

    pub fn disconnect(&self, reason: &str) {
        self.emit(WorldEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Chat line from another player.
    pub fn player_chat(&self, username: &str, message: &str) {
        self.emit(WorldEvent::chat(username, message));
    }

    pub fn system_message(&self, text: &str) {
        self.emit(WorldEvent::system(text));
    }

    /// Kills the agent and cancels any travel in flight.
    pub fn kill(&self) {
        {
            let mut state = self.state();
            state.alive = false;
            state.travel += 1;
        }
        self.emit(WorldEvent::Died);
    }

    /// Revives the agent at its spawn point.
    pub fn respawn(&self) {
        let spawn = {
            let mut state = self.state();
            state.alive = true;
            state.position = state.spawn;
            state.spawn
        };
        self.emit(WorldEvent::moved(spawn));
        self.emit(WorldEvent::Respawned);
    }

    /// Finishes the current travel immediately.
    pub fn arrive(&self) {
        let target = {
            let mut state = self.state();
            state.travel += 1;
            state.position
        };
        self.emit(WorldEvent::moved(target));
        self.emit(WorldEvent::GoalReached);
    }

    pub fn set_player(&self, name: &str, position: Position) {
        self.state().players.insert(name.to_string(), position);
    }

    pub fn remove_player(&self, name: &str) {
        self.state().players.remove(name);
    }

    pub fn spawn_mob(&self, name: &str, position: Position) {
        self.state().entities.push(Entity {
            name: name.to_string(),
            kind: EntityKind::Mob,
            position,
        });
    }

    pub fn clear_mobs(&self) {
        self.state().entities.retain(|e| e.kind != EntityKind::Mob);
    }

    pub fn set_submerged(&self, submerged: bool) {
        self.state().submerged = submerged;
    }

    pub fn set_health(&self, health: f32, food: u32) {
        self.emit(WorldEvent::HealthChanged { health, food });
    }

    fn teleport(&self, position: Position) {
        self.state().position = position;
        self.emit(WorldEvent::moved(position));
    }

    fn give(&self, item: &str, count: u32) {
        let items = {
            let mut state = self.state();
            match state.inventory.iter_mut().find(|stack| stack.name == item) {
                Some(stack) => stack.count += count,
                None => state.inventory.push(ItemStack::new(item, count)),
            }
            state.inventory.clone()
        };
        self.emit(WorldEvent::InventoryChanged { items });
    }

    /// Interprets the server commands the agent uses.
    fn run_command(&self, command: &str) {
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["/give", _, item, count] => match count.parse::<u32>() {
                Ok(count) => self.give(item, count),
                Err(_) => warn!(command, "Bad /give count"),
            },
            ["/tp", name] => {
                let destination = self.state().players.get(*name).copied();
                match destination {
                    Some(position) => self.teleport(position),
                    None => self.system_message(&format!("No player was found: {name}")),
                }
            }
            ["/spawn"] => {
                let spawn = self.state().spawn;
                self.teleport(spawn);
            }
            ["/spawnpoint"] => {
                let mut state = self.state();
                let position = state.position;
                state.spawn = position;
                info!(spawn = %position, "Spawn point set");
            }
            _ => debug!(command, "Command has no effect in simulation"),
        }
    }

    fn use_up(&self, item: &ItemStack) {
        let items = {
            let mut state = self.state();
            let Some(index) = state
                .inventory
                .iter()
                .position(|held| held.display_name == item.display_name)
            else {
                return;
            };
            let held = &mut state.inventory[index];
            held.count = held.count.saturating_sub(1);
            if held.count == 0 {
                state.inventory.remove(index);
            }
            state.inventory.clone()
        };
        self.emit(WorldEvent::InventoryChanged { items });
    }

    pub fn inventory_snapshot(&self) -> Vec<ItemStack> {
        self.state().inventory.clone()
    }
}

impl GameClient for SimWorld {
    fn position(&self) -> Option<Position> {
        let state = self.state();
        state.alive.then_some(state.position)
    }

    fn player_position(&self, username: &str) -> Option<Position> {
        self.state().players.get(username).copied()
    }

    fn chat(&self, text: &str) -> Result<()> {
        info!(text, "Agent says");
        if text.starts_with('/') {
            self.run_command(text);
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
        let previous = self.state().controls.insert(control, active);
        if previous != Some(active) {
            debug!(?control, active, "Control");
        }
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.inventory_snapshot()
    }

    fn equipped(&self, slot: ArmorSlot) -> Option<String> {
        self.state().equipped.get(&slot).cloned()
    }

    fn equip(&self, item: &str, slot: ArmorSlot) -> Result<()> {
        self.state().equipped.insert(slot, item.to_string());
        Ok(())
    }

    fn consume(&self, item: &ItemStack) -> Result<()> {
        info!(item = %item.display_name, "Consumed");
        self.use_up(item);
        Ok(())
    }

    fn activate(&self, item: &ItemStack) -> Result<()> {
        info!(item = %item.display_name, "Thrown");
        self.use_up(item);
        Ok(())
    }
}

impl Navigator for SimWorld {
    fn set_destination(&self, goal: Goal) -> Result<()> {
        let runtime =
            Handle::try_current().map_err(|_| Error::transport("simulation needs a tokio runtime"))?;

        let (travel, eta) = {
            let mut state = self.state();
            if !state.alive {
                return Err(Error::transport("agent is dead"));
            }
            state.travel += 1;
            let distance = (state.position.horizontal_distance(&goal.target) - goal.radius).max(0.0);
            (state.travel, Duration::from_secs_f64(distance / self.speed.max(f64::EPSILON)))
        };
        debug!(target_position = %goal.target, eta_secs = eta.as_secs_f64(), "Travelling");

        let world = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(eta).await;
            {
                let mut state = world.state();
                if state.travel != travel {
                    return;
                }
                state.position = goal.target;
            }
            world.emit(WorldEvent::moved(goal.target));
            world.emit(WorldEvent::GoalReached);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::timeout;

    fn world() -> (SimWorld, UnboundedReceiver<Input>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = SimConfig {
            speed: 1000.0,
            spawn: Position::new(0.0, 64.0, 0.0),
        };
        (SimWorld::new(&config, tx), rx)
    }

    async fn next_event(rx: &mut UnboundedReceiver<Input>) -> WorldEvent {
        match timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(Input::World(event))) => event,
            other => panic!("expected a world event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_travel_lands_on_goal() {
        let (world, mut rx) = world();
        let target = Position::new(100.0, 64.0, 0.0);
        world.set_destination(Goal::near(target, 3.0)).unwrap();

        assert_eq!(next_event(&mut rx).await, WorldEvent::moved(target));
        assert_eq!(next_event(&mut rx).await, WorldEvent::GoalReached);
        assert_eq!(world.position(), Some(target));
    }

    #[tokio::test]
    async fn test_newer_goal_supersedes_older() {
        let (world, mut rx) = world();
        let far = Position::new(2000.0, 64.0, 0.0);
        let near = Position::new(50.0, 64.0, 0.0);
        world.set_destination(Goal::near(far, 0.0)).unwrap();
        world.set_destination(Goal::near(near, 0.0)).unwrap();

        assert_eq!(next_event(&mut rx).await, WorldEvent::moved(near));
        assert_eq!(next_event(&mut rx).await, WorldEvent::GoalReached);

        // The superseded trip never reports.
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(world.position(), Some(near));
    }

    #[tokio::test]
    async fn test_give_and_teleport_commands() {
        let (world, mut rx) = world();
        world.set_player("alice", Position::new(-5.0, 70.0, 5.0));

        world.chat("/give @s oak_log 128").unwrap();
        match next_event(&mut rx).await {
            WorldEvent::InventoryChanged { items } => {
                assert_eq!(items, vec![ItemStack::new("oak_log", 128)]);
            }
            other => panic!("unexpected {other:?}"),
        }

        world.chat("/tp alice").unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            WorldEvent::moved(Position::new(-5.0, 70.0, 5.0))
        );

        world.chat("/tp ghost").unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            WorldEvent::system("No player was found: ghost")
        );

        world.chat("/spawnpoint").unwrap();
        world.chat("/spawn").unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            WorldEvent::moved(Position::new(-5.0, 70.0, 5.0))
        );
    }

    #[tokio::test]
    async fn test_death_blocks_navigation_until_respawn() {
        let (world, mut rx) = world();
        world.kill();
        assert_eq!(next_event(&mut rx).await, WorldEvent::Died);
        assert_eq!(world.position(), None);
        assert!(world.set_destination(Goal::near(Position::default(), 1.0)).is_err());

        world.respawn();
        assert_eq!(
            next_event(&mut rx).await,
            WorldEvent::moved(Position::new(0.0, 64.0, 0.0))
        );
        assert_eq!(next_event(&mut rx).await, WorldEvent::Respawned);
        assert!(world.set_destination(Goal::near(Position::default(), 1.0)).is_ok());
    }
}
