//! # afk-proto
//!
//! Shared types, error definitions, and traits for the afkbot agent.
//!
//! This crate provides the vocabulary every other crate speaks:
//! - Positions and horizontal geometry
//! - Resource kinds and their per-stack gathering cost
//! - Notification categories and the `NotificationSink` boundary
//! - The `Navigator` and `GameClient` collaborator traits
//! - World events raised by the game session
//! - The error taxonomy of the request lifecycle

mod error;
mod event;
mod geometry;
mod notification;
mod resource;
mod world;

pub use error::{Error, Result};
pub use event::WorldEvent;
pub use geometry::Position;
pub use notification::{Category, NotificationSink};
pub use resource::{ResourceFamily, ResourceKind, STACK_SIZE};
pub use world::{
    ArmorSlot, Control, Entity, EntityKind, GameClient, Goal, ItemStack, Navigator,
};
