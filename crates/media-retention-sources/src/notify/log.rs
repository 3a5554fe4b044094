use crate::error::SourceError;
use crate::traits::{Notification, NotificationKind, NotificationSink};
use async_trait::async_trait;
use tracing::{info, warn};

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn sink_name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), SourceError> {
        let recipients = notification.recipients.join(", ");
        match notification.kind {
            NotificationKind::Warning => warn!(
                item_id = %notification.item_id,
                recipients = %recipients,
                "{}",
                notification.message
            ),
            NotificationKind::Deletion => info!(
                item_id = %notification.item_id,
                recipients = %recipients,
                "{}",
                notification.message
            ),
        }
        Ok(())
    }
}
