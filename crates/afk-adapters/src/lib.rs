//! # afk-adapters
//!
//! Concrete collaborators for the agent core:
//! - [`WebhookSink`] posts notifications to per-category webhooks
//! - [`SimWorld`] is an in-process game world used for dry runs

mod sim_world;
mod webhook;

pub use sim_world::SimWorld;
pub use webhook::{MAX_CONTENT_CHARS, WebhookSink, truncate_content};
