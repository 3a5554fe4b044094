use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::ItemKind;

/// Why an examined item was left alone this run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Nobody has rated it, so there is no signal either way
    InsufficientRatings,
    RatingAboveThreshold { score: f64, threshold: f64 },
    NotWatchedEnough { watch_fraction: f64 },
    /// Was warned, but a re-rating now keeps it
    Rescued { score: f64, threshold: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientRatings => write!(f, "insufficient ratings"),
            SkipReason::RatingAboveThreshold { score, threshold } => {
                write!(f, "rating above threshold ({:.2} >= {})", score, threshold)
            }
            SkipReason::NotWatchedEnough { watch_fraction } => {
                write!(f, "not watched enough ({:.0}% watched)", watch_fraction * 100.0)
            }
            SkipReason::Rescued { score, threshold } => {
                write!(f, "rescued by re-rating ({:.2} >= {})", score, threshold)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActedItem {
    pub item_id: String,
    pub title: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedItem {
    pub item_id: String,
    pub title: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemError {
    pub item_id: String,
    pub title: String,
    pub error: String,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Unique items built from history, before any filtering
    pub items_examined: usize,
    pub warned: Vec<ActedItem>,
    pub deleted: Vec<ActedItem>,
    pub skipped: Vec<SkippedItem>,
    pub errors: Vec<ItemError>,
}

impl RunSummary {
    pub fn new(dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            dry_run,
            started_at,
            finished_at: None,
            items_examined: 0,
            warned: Vec::new(),
            deleted: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warned_ids(&self) -> Vec<&str> {
        self.warned.iter().map(|i| i.item_id.as_str()).collect()
    }

    pub fn deleted_ids(&self) -> Vec<&str> {
        self.deleted.iter().map(|i| i.item_id.as_str()).collect()
    }

    pub fn skipped_ids(&self) -> Vec<&str> {
        self.skipped.iter().map(|i| i.item_id.as_str()).collect()
    }

    pub fn deleted_count(&self, kind: ItemKind) -> usize {
        self.deleted.iter().filter(|i| i.kind == kind).count()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_strings() {
        assert_eq!(SkipReason::InsufficientRatings.to_string(), "insufficient ratings");
        let reason = SkipReason::RatingAboveThreshold { score: 8.0, threshold: 6.5 };
        assert_eq!(reason.to_string(), "rating above threshold (8.00 >= 6.5)");
    }

    #[test]
    fn test_skipped_item_json_is_flat() {
        let skipped = SkippedItem {
            item_id: "7".to_string(),
            title: "Show".to_string(),
            reason: SkipReason::InsufficientRatings,
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["item_id"], "7");
        assert_eq!(json["reason"], "insufficient_ratings");
    }

    #[test]
    fn test_deleted_count_by_kind() {
        let mut summary = RunSummary::new(false, Utc::now());
        summary.deleted.push(ActedItem { item_id: "1".into(), title: "A".into(), kind: ItemKind::Movie });
        summary.deleted.push(ActedItem { item_id: "2".into(), title: "B".into(), kind: ItemKind::Series });
        summary.deleted.push(ActedItem { item_id: "3".into(), title: "C".into(), kind: ItemKind::Movie });
        assert_eq!(summary.deleted_count(ItemKind::Movie), 2);
        assert_eq!(summary.deleted_count(ItemKind::Series), 1);
        assert_eq!(summary.deleted_ids(), vec!["1", "2", "3"]);
    }
}
