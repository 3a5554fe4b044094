use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of the thing a single history row refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Episode,
}

/// One user's viewing of one media item, as reported by the history feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEvent {
    pub item_id: String,
    pub media_type: MediaType,
    /// Series id for episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Series title for episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
    pub user: String,
    /// Rating left by `user` alongside this view (10-point scale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub watched_at: DateTime<Utc>,
    /// 1.0 = watched to the end, 0.5 = partially watched, 0.0 = barely started
    pub completion: f64,
    pub library_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// Series GUID for episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_guid: Option<String>,
}

impl WatchEvent {
    pub fn is_fully_watched(&self) -> bool {
        self.completion >= 1.0
    }
}
