//! Handles to the external collaborators, shared by every behaviour.

use afk_proto::{GameClient, Navigator, NotificationSink};
use std::sync::Arc;

/// The game session, the navigator and the notification sink.
#[derive(Clone)]
pub struct Ports {
    pub client: Arc<dyn GameClient>,
    pub navigator: Arc<dyn Navigator>,
    pub sink: Arc<dyn NotificationSink>,
}

impl Ports {
    pub fn new(
        client: Arc<dyn GameClient>,
        navigator: Arc<dyn Navigator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            client,
            navigator,
            sink,
        }
    }

    /// Sends a chat line, logging instead of failing.
    pub fn say(&self, text: &str) {
        if let Err(e) = self.client.chat(text) {
            tracing::warn!(error = %e, text, "Chat send failed");
        }
    }
}
