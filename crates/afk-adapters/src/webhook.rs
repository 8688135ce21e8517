//! Discord-style webhook notifications.
//!
//! Each category posts to its own URL, falling back to the default one.
//! Posting happens on a spawned task, so `notify` never blocks the agent
//! loop. Failures are logged and dropped.

use afk_core::config::NotificationsConfig;
use afk_proto::{Category, NotificationSink};
use serde_json::json;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Webhook message bodies are capped at this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortens `text` to at most `max` characters, marking the cut.
pub fn truncate_content(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub struct WebhookSink {
    client: reqwest::Client,
    routes: NotificationsConfig,
}

impl WebhookSink {
    pub fn new(routes: NotificationsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, routes }
    }

    /// Whether any category has somewhere to go.
    pub fn is_configured(&self) -> bool {
        Category::ALL
            .iter()
            .any(|category| self.routes.url_for(*category).is_some())
    }
}

impl NotificationSink for WebhookSink {
    fn notify(&self, category: Category, text: &str) {
        let Some(url) = self.routes.url_for(category) else {
            info!(%category, "{text}");
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(%category, "No async runtime, notification dropped");
            return;
        };

        let client = self.client.clone();
        let url = url.to_string();
        let body = json!({ "content": truncate_content(text, MAX_CONTENT_CHARS) });
        runtime.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%category, "Notification delivered");
                }
                Ok(response) => {
                    warn!(%category, status = %response.status(), "Webhook rejected notification");
                }
                Err(e) => warn!(%category, error = %e, "Webhook post failed"),
            }
        });
    }
}
