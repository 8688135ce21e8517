//! Console driver for the simulated world.
//!
//! Each stdin line is either a chat line (`alice: !request oak_log 2 me`) or
//! a `:`-prefixed world command that pokes the simulation.

use afk_adapters::SimWorld;
use afk_core::Input;
use afk_proto::Position;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

pub const HELP: &str = "\
  <name>: <text>        chat as another player
  :join                 (re)join the server
  :drop <reason>        disconnect
  :die | :respawn       kill or revive the agent
  :arrive               finish the current trip now
  :player <name> x y z  place a player
  :mob <name> x y z     spawn a mob
  :msg <text>           system message
  :health <hp> <food>   change vitals
  :status               print the agent status
  :quit                 exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Chat { username: String, message: String },
    Join,
    Drop { reason: String },
    Die,
    Respawn,
    Arrive,
    Player { name: String, position: Position },
    Mob { name: String, position: Position },
    Message { text: String },
    Health { health: f32, food: u32 },
    Status,
    Help,
    Quit,
}

fn position(args: &[&str]) -> Result<Position> {
    let [x, y, z] = args else {
        bail!("expected three coordinates");
    };
    Ok(Position::new(
        x.parse().context("bad x")?,
        y.parse().context("bad y")?,
        z.parse().context("bad z")?,
    ))
}

/// Parses one console line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(':') else {
        let Some((username, message)) = line.split_once(':') else {
            bail!("expected `<name>: <text>` or a `:command`");
        };
        let username = username.trim();
        if username.is_empty() || username.contains(char::is_whitespace) {
            bail!("bad player name {username:?}");
        }
        return Ok(Some(ConsoleCommand::Chat {
            username: username.to_string(),
            message: message.trim().to_string(),
        }));
    };

    let (word, tail) = rest.split_once(' ').unwrap_or((rest, ""));
    let tail = tail.trim();
    let args: Vec<&str> = tail.split_whitespace().collect();

    let command = match (word, args.as_slice()) {
        ("join", []) => ConsoleCommand::Join,
        ("drop", _) => ConsoleCommand::Drop {
            reason: if tail.is_empty() { "disconnected".to_string() } else { tail.to_string() },
        },
        ("die", []) => ConsoleCommand::Die,
        ("respawn", []) => ConsoleCommand::Respawn,
        ("arrive", []) => ConsoleCommand::Arrive,
        ("player", [name, coords @ ..]) => ConsoleCommand::Player {
            name: (*name).to_string(),
            position: position(coords)?,
        },
        ("mob", [name, coords @ ..]) => ConsoleCommand::Mob {
            name: (*name).to_string(),
            position: position(coords)?,
        },
        ("msg", _) if !tail.is_empty() => ConsoleCommand::Message {
            text: tail.to_string(),
        },
        ("health", [health, food]) => ConsoleCommand::Health {
            health: health.parse().context("bad health")?,
            food: food.parse().context("bad food")?,
        },
        ("status", []) => ConsoleCommand::Status,
        ("help", []) => ConsoleCommand::Help,
        ("quit" | "q", []) => ConsoleCommand::Quit,
        _ => bail!("unknown command :{word} (try :help)"),
    };
    Ok(Some(command))
}

/// Reads console lines until `:quit`, end of input or Ctrl-C.
pub async fn drive(world: &SimWorld, inputs: mpsc::UnboundedSender<Input>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", "afkbot console, :help for commands".dimmed());

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl-C received");
                None
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {e:#}", "error:".red().bold());
                continue;
            }
        };

        match command {
            ConsoleCommand::Chat { username, message } => world.player_chat(&username, &message),
            ConsoleCommand::Join => world.join(),
            ConsoleCommand::Drop { reason } => world.disconnect(&reason),
            ConsoleCommand::Die => world.kill(),
            ConsoleCommand::Respawn => world.respawn(),
            ConsoleCommand::Arrive => world.arrive(),
            ConsoleCommand::Player { name, position } => {
                world.set_player(&name, position);
                println!("{} {name} at {position}", "placed".green());
            }
            ConsoleCommand::Mob { name, position } => {
                world.spawn_mob(&name, position);
                println!("{} {name} at {position}", "spawned".yellow());
            }
            ConsoleCommand::Message { text } => world.system_message(&text),
            ConsoleCommand::Health { health, food } => world.set_health(health, food),
            ConsoleCommand::Status => {
                let (reply, answer) = oneshot::channel();
                inputs
                    .send(Input::StatusQuery(reply))
                    .context("agent is not running")?;
                let status = answer.await.context("agent dropped the status query")?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => return Ok(()),
        }
    }
}
