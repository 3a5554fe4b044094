use crate::error::{action_error, SourceError};
use crate::traits::{Notification, NotificationSink};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts `{"content": "<message>"}` to a chat webhook (Discord and compatible).
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, url })
    }

    async fn post(&self, content: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "content": content }))
            .timeout(WEBHOOK_TIMEOUT)
            .send()
            .await
            .context("Failed to post webhook notification")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Webhook returned {}", response.status()));
        }
        Ok(())
    }
}

/// Message body with the people who watched or rated the item appended.
pub fn render_content(notification: &Notification) -> String {
    if notification.recipients.is_empty() {
        notification.message.clone()
    } else {
        format!(
            "{}\nWatched by: {}",
            notification.message,
            notification.recipients.join(", ")
        )
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    fn sink_name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), SourceError> {
        debug!("Webhook: sending {:?} for {}", notification.kind, notification.item_id);
        self.post(&render_content(notification))
            .await
            .map_err(action_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NotificationKind;

    fn notification(recipients: &[&str]) -> Notification {
        Notification {
            kind: NotificationKind::Warning,
            item_id: "42".to_string(),
            title: "The Room".to_string(),
            message: "'The Room' will be deleted in 7 days".to_string(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_render_content() {
        assert_eq!(
            render_content(&notification(&[])),
            "'The Room' will be deleted in 7 days"
        );
        assert_eq!(
            render_content(&notification(&["alice", "bob"])),
            "'The Room' will be deleted in 7 days\nWatched by: alice, bob"
        );
    }
}
