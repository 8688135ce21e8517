//! `afkbot`: runs the agent against a simulated world, or checks a config.

mod console;

use afk_adapters::{SimWorld, WebhookSink};
use afk_core::{Agent, AgentConfig, Ports};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "afkbot.yml";

#[derive(Parser, Debug)]
#[command(name = "afkbot", version, about = "Persistent gather-and-deliver game agent")]
struct Cli {
    /// Configuration file (defaults to ./afkbot.yml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the agent from console input against a simulated world
    Run,
    /// Validate the configuration and print the effective settings
    Check,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    match path {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            AgentConfig::from_file(DEFAULT_CONFIG).context("loading afkbot.yml")
        }
        None => {
            info!("No config file, using defaults");
            Ok(AgentConfig::default())
        }
    }
}

async fn run(config: AgentConfig) -> Result<()> {
    let (inputs, rx) = mpsc::unbounded_channel();
    let world = Arc::new(SimWorld::new(&config.sim, inputs.clone()));
    let sink = Arc::new(WebhookSink::new(config.notifications.clone()));
    if !sink.is_configured() {
        info!("No webhooks configured, notifications go to the log");
    }

    info!(name = %config.name, spawn = %config.sim.spawn, "Starting agent");
    let ports = Ports::new(world.clone(), world.clone(), sink);
    let agent = tokio::spawn(Agent::new(config, ports).run(rx));

    world.join();
    let outcome = console::drive(&world, inputs).await;

    // The simulated world keeps a sender alive, so the loop is stopped
    // rather than drained.
    agent.abort();
    info!("Agent stopped");
    outcome
}

fn check(config: &AgentConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("serializing config")?;
    println!("{}", "Configuration OK".green().bold());
    print!("{yaml}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Check => check(&config),
    }
}
