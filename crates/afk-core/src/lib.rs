//! # afk-core
//!
//! The agent itself: everything between world events coming in and chat
//! lines, navigation goals and notifications going out.
//!
//! This crate provides:
//! - The request lifecycle scheduler (travel, wander, deliver, cancel)
//! - Bounded-retry relocation for delivery and return trips
//! - The chat command router
//! - The passive survival loop and presence tracking
//! - Inventory, vitals and death monitors
//! - The single-task agent event loop that ties them together
//!
//! All deferred work runs off [`TimerQueue`]s driven by the agent loop.
//! Components take the current instant as an argument, so tests step
//! through hours of simulated time with [`run_until`].

pub mod agent;
pub mod config;
pub mod monitor;
pub mod notify;
pub mod passive;
mod ports;
mod presence;
pub mod request;
pub mod router;
mod status;
#[cfg(any(test, feature = "recording"))]
pub mod testing;
pub mod timers;

pub use agent::{Agent, Input};
pub use config::{AgentConfig, ConfigError};
pub use monitor::{DeathMonitor, InventoryChange, InventoryMonitor, VitalsMonitor};
pub use passive::{PassiveLoop, TickReport};
pub use ports::Ports;
pub use presence::PresenceTracker;
pub use request::{
    Accepted, CancelOutcome, Order, Phase, Request, RequestId, RequestManager,
};
pub use router::{Command, Router};
pub use status::{AgentStatus, RequestStatus};
pub use timers::{Scheduled, TimerId, TimerQueue, run_until};
