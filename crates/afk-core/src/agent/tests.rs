use super::*;
use crate::config::AgentConfig;
use crate::request::Phase;
use crate::testing::{RecordingSink, RecordingWorld};
use crate::timers::run_until;
use afk_proto::{ArmorSlot, GameClient, Position};
use std::sync::Arc;

const HOME: Position = Position::new(100.0, 70.0, 100.0);
const ALICE: Position = Position::new(-50.0, 64.0, 20.0);

struct Harness {
    world: Arc<RecordingWorld>,
    sink: Arc<RecordingSink>,
    agent: Agent,
    start: Instant,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AgentConfig::default())
    }

    fn with_config(mut config: AgentConfig) -> Self {
        config.seed = Some(11);
        let world = Arc::new(RecordingWorld::at(HOME).with_player("alice", ALICE));
        let sink = Arc::new(RecordingSink::new());
        let ports = Ports::new(world.clone(), world.clone(), sink.clone());
        Self {
            agent: Agent::new(config, ports),
            world,
            sink,
            start: Instant::now(),
        }
    }

    fn at(&self, secs: u64) -> Instant {
        self.start + Duration::from_secs(secs)
    }

    fn send(&mut self, secs: u64, event: WorldEvent) {
        let now = self.at(secs);
        self.agent.handle(now, event);
    }

    fn run_to(&mut self, secs: u64) {
        let until = self.at(secs);
        run_until(&mut self.agent, until);
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_first_join_then_reconnect() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    assert_eq!(
        h.sink.texts(Category::Connection),
        vec!["✅ AFKBot joined the server"]
    );
    assert!(h.agent.passive().is_running());

    h.send(1, WorldEvent::chat("alice", "!request oak_log 2 me"));
    h.send(
        5,
        WorldEvent::Disconnected {
            reason: "timed out".to_string(),
        },
    );
    h.world.take_chat();
    h.send(9, WorldEvent::Joined);

    assert_eq!(
        h.sink.texts(Category::Connection),
        vec![
            "✅ AFKBot joined the server",
            "🔌 AFKBot disconnected: timed out",
            "🔌 AFKBot reconnected",
        ]
    );
    assert_eq!(h.world.chat_log(), vec!["restart me"]);
    assert!(h.agent.manager().is_active());
}

#[test]
fn test_anti_afk_holds_controls_on_join() {
    let mut config = AgentConfig::default();
    config.session.anti_afk.enabled = true;
    config.session.anti_afk.sneak = true;
    let mut h = Harness::with_config(config);

    h.send(0, WorldEvent::Joined);
    assert!(h.world.control(Control::Jump));
    assert!(h.world.control(Control::Sneak));
}

#[test]
fn test_home_goal_on_join() {
    let mut config = AgentConfig::default();
    config.session.home = Some(Position::new(10.0, 64.0, 10.0));
    let mut h = Harness::with_config(config);

    h.send(0, WorldEvent::Joined);
    assert_eq!(
        h.world.last_goal(),
        Some(Goal::near(Position::new(10.0, 64.0, 10.0), 0.0))
    );
}

#[test]
fn test_repeating_announcements_cycle_and_survive_rejoin() {
    let mut config = AgentConfig::default();
    config.session.announcements.enabled = true;
    config.session.announcements.repeat = true;
    config.session.announcements.interval_secs = 60;
    config.session.announcements.messages = vec!["shop open".to_string(), "ask me".to_string()];
    let mut h = Harness::with_config(config);

    h.send(0, WorldEvent::Joined);
    assert!(h.world.chat_log().is_empty());

    h.run_to(180);
    assert_eq!(h.world.take_chat(), vec!["shop open", "ask me", "shop open"]);

    // A rejoin restarts the cycle instead of adding a second one.
    h.send(200, WorldEvent::Joined);
    h.run_to(260);
    assert_eq!(h.world.take_chat(), vec!["shop open"]);
}

#[test]
fn test_one_shot_announcements_on_join() {
    let mut config = AgentConfig::default();
    config.session.announcements.enabled = true;
    config.session.announcements.messages = vec!["hello".to_string(), "world".to_string()];
    let mut h = Harness::with_config(config);

    h.send(0, WorldEvent::Joined);
    assert_eq!(h.world.chat_log(), vec!["hello", "world"]);
    h.run_to(300);
    assert_eq!(h.world.chat_log(), vec!["hello", "world"]);
}

// ─────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_chat_commands_are_answered() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(1, WorldEvent::chat("alice", "!request oak_log 2 me"));
    h.send(2, WorldEvent::chat("alice", "just chatting"));

    assert!(h.world.chat_log().contains(&"gathering, wait 6 minutes".to_string()));
    assert_eq!(h.world.chat_log().len(), 1);
    assert_eq!(h.agent.manager().active().unwrap().recipient, "alice");
}

#[test]
fn test_own_chat_lines_are_ignored() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(1, WorldEvent::chat("alice", "!request stone 1 me"));
    h.send(2, WorldEvent::chat("AFKBot", "!request cancel"));

    assert!(h.agent.manager().is_active());
}

// ─────────────────────────────────────────────────────────────────────────
// Request lifecycle through events
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_full_cycle_from_events() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(0, WorldEvent::chat("alice", "!request oak_log 2 me"));
    h.send(30, WorldEvent::GoalReached);
    assert_eq!(
        h.agent.manager().active().unwrap().phase(),
        Phase::Wandering
    );

    h.run_to(minutes(6) + 5);

    assert!(!h.agent.manager().is_active());
    let chat = h.world.chat_log();
    assert!(chat.contains(&"/give @s oak_log 128".to_string()));
    assert!(chat.contains(&"/tp alice".to_string()));
    assert!(chat.contains(&"kill me so the item will drop".to_string()));
    assert_eq!(h.world.position(), Some(ALICE));
    assert!(h.sink.contains("✅ **Request Complete**"));
    assert!(h.sink.contains("Delivered to: alice (arrived)"));
}

#[test]
fn test_flee_is_suppressed_while_request_active() {
    let mut h = Harness::new();
    h.world.spawn_mob("zombie", HOME.offset(0.0, 5.0));
    h.send(0, WorldEvent::Joined);

    h.run_to(1);
    assert_eq!(h.world.goals().len(), 1, "idle agent flees");

    h.send(1, WorldEvent::chat("alice", "!request oak_log 2 me"));
    let goals = h.world.goals().len();
    h.run_to(4);
    assert_eq!(h.world.goals().len(), goals);
}

#[test]
fn test_death_and_respawn_mid_request() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(0, WorldEvent::chat("alice", "!request stone 1 me"));
    let goals = h.world.goals().len();

    h.send(20, WorldEvent::Died);
    h.send(20, WorldEvent::system("AFKBot was slain by Zombie"));
    assert_eq!(
        h.sink.texts(Category::Death),
        vec!["💀 AFKBot died", "💀 AFKBot died: AFKBot was slain by Zombie"]
    );
    assert!(h.sink.contains("AFKBot died during gathering, continuing process."));
    let request = h.agent.status(h.at(20)).request.unwrap();
    assert!(request.died_mid_request);
    assert!(!request.awaiting_arrival);

    h.send(25, WorldEvent::Respawned);
    assert_eq!(h.world.goals().len(), goals + 1);

    let request = h.agent.status(h.at(25)).request.unwrap();
    assert!(!request.died_mid_request);
    assert!(request.awaiting_arrival);
}

#[test]
fn test_teleport_requests_accepted_only_when_idle() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(
        1,
        WorldEvent::system("[SimpleTPA] alice has sent you a teleport request"),
    );
    assert_eq!(h.world.take_chat(), vec!["/tpaccept"]);

    h.send(2, WorldEvent::chat("alice", "!request stone 1 me"));
    h.world.take_chat();
    h.send(
        3,
        WorldEvent::system("[SimpleTPA] alice has sent you a teleport request"),
    );
    assert!(h.world.chat_log().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────
// Monitors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn test_inventory_event_notifies_and_equips() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);

    h.world.set_inventory(vec![ItemStack::new("iron_helmet", 1)]);
    let items = h.world.inventory();
    h.send(3, WorldEvent::InventoryChanged { items });

    assert_eq!(h.sink.count(Category::Inventory), 1);
    assert_eq!(
        h.world.equipped(ArmorSlot::Head).as_deref(),
        Some("iron_helmet")
    );
}

#[test]
fn test_reconcile_catches_silent_inventory_changes() {
    let mut h = Harness::new();
    h.world.set_inventory(vec![ItemStack::new("bread", 4)]);
    h.send(0, WorldEvent::Joined);
    h.world.set_inventory(vec![ItemStack::new("bread", 2)]);

    h.run_to(29);
    assert_eq!(h.sink.count(Category::Inventory), 0);
    h.run_to(30);
    assert!(h.sink.contains("➖ Removed: bread 2"));
}

#[test]
fn test_health_changes_are_reported() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::HealthChanged { health: 20.0, food: 20 });
    h.send(1, WorldEvent::HealthChanged { health: 20.0, food: 20 });
    h.send(2, WorldEvent::HealthChanged { health: 12.0, food: 18 });
    assert_eq!(h.sink.count(Category::Health), 2);
}

#[test]
fn test_status_snapshot() {
    let mut h = Harness::new();
    h.send(0, WorldEvent::Joined);
    h.send(0, WorldEvent::moved(Position::new(100.0, 20.0, 100.0)));

    let status = h.agent.status(h.at(0));
    assert_eq!(status.name, "AFKBot");
    assert!(status.underground);
    assert_eq!(status.last_surface, Some(HOME));
    assert!(status.request.is_none());
}

// ─────────────────────────────────────────────────────────────────────────
// Event loop
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_run_answers_status_and_stops_when_inputs_close() {
    let h = Harness::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(h.agent.run(rx));

    tx.send(Input::World(WorldEvent::Joined)).unwrap();
    tx.send(Input::World(WorldEvent::chat("alice", "!request oak_log 2 me")))
        .unwrap();
    let (reply, answer) = oneshot::channel();
    tx.send(Input::StatusQuery(reply)).unwrap();

    let status = answer.await.unwrap();
    let request = status.request.unwrap();
    assert_eq!(request.phase, Phase::Traveling);
    assert_eq!(request.recipient, "alice");

    drop(tx);
    handle.await.unwrap();
}

fn minutes(m: u64) -> u64 {
    m * 60
}
