use crate::error::SourceError;
use async_trait::async_trait;
use media_retention_models::{ItemKind, MediaItem, Ratings, WatchEvent};

/// Read-only feed of watch events.
#[async_trait]
pub trait HistorySource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Full watch history. Any failure here aborts the run.
    async fn fetch_watch_history(&self) -> Result<Vec<WatchEvent>, SourceError>;

    /// Total episodes in a series, when the source knows it.
    async fn fetch_episode_count(&self, _series_id: &str) -> Result<Option<u32>, SourceError> {
        Ok(None)
    }

    /// Every external GUID attached to an item, used to find it in the library managers.
    async fn fetch_external_guids(&self, _item_id: &str) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }
}

/// Read-only per-item rating lookup. A missing user means no rating.
#[async_trait]
pub trait RatingSource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch_ratings(&self, item: &MediaItem) -> Result<Ratings, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Library manager no longer knows the item; deleting again is a no-op
    AlreadyAbsent,
}

/// Write-only "delete this item and its files" sink. Must be idempotent.
#[async_trait]
pub trait DeletionSink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn delete(&self, item: &MediaItem) -> Result<DeleteOutcome, SourceError>;

    /// Whether this sink can delete items of `kind` at all.
    fn handles(&self, _kind: ItemKind) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Warning,
    Deletion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub item_id: String,
    pub title: String,
    pub message: String,
    /// Users who watched or rated the item
    pub recipients: Vec<String>,
}

/// Write-only message sink.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn notify(&self, notification: &Notification) -> Result<(), SourceError>;
}
