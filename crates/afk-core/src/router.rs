//! Command Router: chat text in, one lifecycle operation and one
//! acknowledgment out.

use crate::ports::Ports;
use crate::presence::PresenceTracker;
use crate::request::{CancelOutcome, Order, RequestManager};
use afk_proto::{Category, Goal};
use tokio::time::Instant;
use tracing::{info, warn};

pub const REQUEST_USAGE: &str = "Usage: !request <item> <stacks> <player> or !request cancel";
pub const TP_USAGE: &str = "Usage: !tp [username] or !tp me";
pub const INVALID_STACKS: &str = "Invalid number of stacks.";

/// Approach radius when walking to a player.
const COME_RADIUS: f64 = 1.0;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit {
        resource: String,
        stacks: u32,
        /// Player name or `me`.
        recipient: String,
    },
    Cancel,
    Status,
    Come,
    Teleport {
        target: String,
    },
    SetSpawn,
    /// Recognised command with bad arguments; the reply to send.
    Invalid(&'static str),
}

/// Parses a chat line. `None` means "not for us": no reply is sent.
pub fn parse(message: &str) -> Option<Command> {
    let parts: Vec<&str> = message.split_whitespace().collect();
    let (&word, args) = parts.split_first()?;

    let command = match word {
        "!request" => match args {
            ["cancel"] => Command::Cancel,
            ["status"] => Command::Status,
            [resource, stacks, recipient] => match parse_stacks(stacks) {
                Some(stacks) => Command::Submit {
                    resource: (*resource).to_string(),
                    stacks,
                    recipient: (*recipient).to_string(),
                },
                None => Command::Invalid(INVALID_STACKS),
            },
            _ => Command::Invalid(REQUEST_USAGE),
        },
        "!tp" => match args {
            [target] => Command::Teleport {
                target: (*target).to_string(),
            },
            _ => Command::Invalid(TP_USAGE),
        },
        "!come" if args.is_empty() => Command::Come,
        "!setspawn" if args.is_empty() => Command::SetSpawn,
        _ => return None,
    };
    Some(command)
}

fn parse_stacks(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|stacks| *stacks > 0)
}

/// Resolves `me` to the speaker.
fn resolve<'a>(target: &'a str, username: &'a str) -> &'a str {
    if target.eq_ignore_ascii_case("me") {
        username
    } else {
        target
    }
}

/// Carries out commands against the lifecycle manager and the world.
pub struct Router {
    name: String,
    owner: Option<String>,
    ports: Ports,
}

impl Router {
    pub fn new(name: impl Into<String>, owner: Option<String>, ports: Ports) -> Self {
        Self {
            name: name.into(),
            owner,
            ports,
        }
    }

    /// Runs `command` for `username` and returns the acknowledgment.
    pub fn dispatch(
        &self,
        now: Instant,
        username: &str,
        command: Command,
        manager: &mut RequestManager,
        presence: &PresenceTracker,
    ) -> String {
        match command {
            Command::Submit {
                resource,
                stacks,
                recipient,
            } => {
                let recipient = resolve(&recipient, username).to_string();
                match manager.submit(now, Order::new(resource, stacks, recipient, username)) {
                    Ok(accepted) => format!("gathering, wait {} minutes", accepted.duration_minutes),
                    Err(e) => {
                        info!(username, error = %e, "Request rejected");
                        e.to_string()
                    }
                }
            }
            Command::Cancel => match manager.cancel(now, username) {
                CancelOutcome::Cancelled { .. } => "Request cancelled.".to_string(),
                CancelOutcome::NothingToCancel => "No active request to cancel.".to_string(),
            },
            Command::Status => manager
                .status(now)
                .map_or_else(|| "No active request.".to_string(), |status| status.summary()),
            Command::Come => self.come(username, presence),
            Command::Teleport { target } => {
                let target = resolve(&target, username);
                self.ports.say(&format!("/tp {target}"));
                info!(username, target, "Teleporting");
                format!("Teleporting to {target}!")
            }
            Command::SetSpawn => self.set_spawn(username),
            Command::Invalid(reply) => reply.to_string(),
        }
    }

    fn come(&self, username: &str, presence: &PresenceTracker) -> String {
        let Some(player) = self.ports.client.player_position(username) else {
            return "Cannot find your position.".to_string();
        };

        if !presence.is_below_surface(&player) && presence.is_underground() {
            info!(username, "Surfacing before approaching player");
            presence.escape(&*self.ports.navigator);
            return "Surfacing to come to you!".to_string();
        }

        match self
            .ports
            .navigator
            .set_destination(Goal::near(player, COME_RADIUS))
        {
            Ok(()) => {
                info!(username, "Going to player");
                "Coming to you!".to_string()
            }
            Err(e) => {
                warn!(username, error = %e, "Could not path to player");
                "Cannot move right now.".to_string()
            }
        }
    }

    fn set_spawn(&self, username: &str) -> String {
        if self.owner.as_deref().is_some_and(|owner| owner != username) {
            info!(username, "Refusing spawn change from non-owner");
            return "Only my owner can set my spawn.".to_string();
        }
        self.ports.say("/spawnpoint");
        self.ports.sink.notify(
            Category::Spawn,
            &format!("{} spawn set successfully!", self.name),
        );
        "Spawn set successfully!".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, PresenceConfig};
    use crate::testing::{RecordingSink, RecordingWorld};
    use afk_proto::Position;
    use std::sync::Arc;

    #[test]
    fn test_parse_request_forms() {
        assert_eq!(
            parse("!request oak_log 2 me"),
            Some(Command::Submit {
                resource: "oak_log".to_string(),
                stacks: 2,
                recipient: "me".to_string()
            })
        );
        assert_eq!(parse("!request cancel"), Some(Command::Cancel));
        assert_eq!(parse("!request status"), Some(Command::Status));
        assert_eq!(parse("!request oak_log"), Some(Command::Invalid(REQUEST_USAGE)));
        assert_eq!(parse("!request"), Some(Command::Invalid(REQUEST_USAGE)));
    }

    #[test]
    fn test_parse_rejects_bad_stack_counts() {
        for raw in ["0", "-3", "two", "1.5", "99999999999"] {
            assert_eq!(
                parse(&format!("!request stone {raw} bob")),
                Some(Command::Invalid(INVALID_STACKS)),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_parse_tp_and_others() {
        assert_eq!(
            parse("!tp me"),
            Some(Command::Teleport {
                target: "me".to_string()
            })
        );
        assert_eq!(parse("!tp"), Some(Command::Invalid(TP_USAGE)));
        assert_eq!(parse("!tp a b"), Some(Command::Invalid(TP_USAGE)));
        assert_eq!(parse("!come"), Some(Command::Come));
        assert_eq!(parse("!setspawn"), Some(Command::SetSpawn));
    }

    #[test]
    fn test_non_commands_are_ignored() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("!dance"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("!come here"), None);
    }

    struct Fixture {
        world: Arc<RecordingWorld>,
        sink: Arc<RecordingSink>,
        router: Router,
        manager: RequestManager,
        presence: PresenceTracker,
    }

    fn fixture(owner: Option<&str>) -> Fixture {
        let world = Arc::new(
            RecordingWorld::at(Position::new(0.0, 64.0, 0.0))
                .with_player("alice", Position::new(30.0, 64.0, 0.0)),
        );
        let sink = Arc::new(RecordingSink::new());
        let ports = Ports::new(world.clone(), world.clone(), sink.clone());
        let mut config = AgentConfig::default();
        config.seed = Some(1);
        Fixture {
            router: Router::new("AFKBot", owner.map(str::to_string), ports.clone()),
            manager: RequestManager::new(&config, ports),
            presence: PresenceTracker::new(PresenceConfig::default()),
            world,
            sink,
        }
    }

    impl Fixture {
        fn say(&mut self, username: &str, message: &str) -> Option<String> {
            let command = parse(message)?;
            Some(self.router.dispatch(
                Instant::now(),
                username,
                command,
                &mut self.manager,
                &self.presence,
            ))
        }
    }

    #[test]
    fn test_request_replies() {
        let mut f = fixture(None);
        assert_eq!(
            f.say("alice", "!request oak_log 2 me").as_deref(),
            Some("gathering, wait 6 minutes")
        );
        assert_eq!(f.manager.active().unwrap().recipient, "alice");
        assert_eq!(
            f.say("bob", "!request stone 1 bob").as_deref(),
            Some("Already processing a request. Please wait.")
        );
        assert!(f.say("bob", "!request status").unwrap().starts_with("Request #1: oak_log x128"));
        assert_eq!(f.say("bob", "!request cancel").as_deref(), Some("Request cancelled."));
        assert_eq!(
            f.say("bob", "!request cancel").as_deref(),
            Some("No active request to cancel.")
        );
        assert_eq!(f.say("bob", "!request status").as_deref(), Some("No active request."));
    }

    #[test]
    fn test_come_paths_to_player_or_surfaces_first() {
        let mut f = fixture(None);
        assert_eq!(f.say("alice", "!come").as_deref(), Some("Coming to you!"));
        assert_eq!(
            f.world.last_goal(),
            Some(Goal::near(Position::new(30.0, 64.0, 0.0), 1.0))
        );

        let now = Instant::now();
        f.presence.on_move(now, Position::new(0.0, 64.0, 0.0));
        f.presence.on_move(now, Position::new(0.0, 20.0, 0.0));
        assert_eq!(f.say("alice", "!come").as_deref(), Some("Surfacing to come to you!"));
        assert_eq!(
            f.world.last_goal(),
            Some(Goal::near(Position::new(0.0, 64.0, 0.0), 5.0))
        );

        assert_eq!(f.say("ghost", "!come").as_deref(), Some("Cannot find your position."));
    }

    #[test]
    fn test_tp_resolves_me() {
        let mut f = fixture(None);
        assert_eq!(f.say("alice", "!tp me").as_deref(), Some("Teleporting to alice!"));
        assert_eq!(f.say("alice", "!tp bob").as_deref(), Some("Teleporting to bob!"));
        assert_eq!(f.world.chat_log(), vec!["/tp alice", "/tp bob"]);
    }

    #[test]
    fn test_setspawn_is_owner_only() {
        let mut f = fixture(Some("woopsyy69"));
        assert_eq!(
            f.say("alice", "!setspawn").as_deref(),
            Some("Only my owner can set my spawn.")
        );
        assert!(f.world.chat_log().is_empty());

        assert_eq!(
            f.say("woopsyy69", "!setspawn").as_deref(),
            Some("Spawn set successfully!")
        );
        assert_eq!(f.world.chat_log(), vec!["/spawnpoint"]);
        assert_eq!(f.sink.count(Category::Spawn), 1);
    }
}
