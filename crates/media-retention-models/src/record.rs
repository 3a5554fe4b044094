use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an item in the warn-then-delete lifecycle.
///
/// Ordered `Unseen < Warned < Deleted`. An item without a stored record is `Unseen`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Unseen,
    Warned,
    Deleted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Unseen => write!(f, "unseen"),
            Phase::Warned => write!(f, "warned"),
            Phase::Deleted => write!(f, "deleted"),
        }
    }
}

/// Durable lifecycle state of one item, keyed by item id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionRecord {
    pub item_id: String,
    pub phase: Phase,
    pub phase_entered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RetentionRecord {
    pub fn warned(item_id: impl Into<String>, title: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            phase: Phase::Warned,
            phase_entered_at: at,
            title,
        }
    }

    /// Tombstone kept after deletion so the item is never warned or deleted again.
    pub fn deleted(item_id: impl Into<String>, title: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            phase: Phase::Deleted,
            phase_entered_at: at,
            title,
        }
    }
}

/// Phase of an item given its (possibly absent) record.
pub fn phase_of(record: Option<&RetentionRecord>) -> Phase {
    record.map(|r| r.phase).unwrap_or(Phase::Unseen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering() {
        assert!(Phase::Unseen < Phase::Warned);
        assert!(Phase::Warned < Phase::Deleted);
    }

    #[test]
    fn test_missing_record_is_unseen() {
        assert_eq!(phase_of(None), Phase::Unseen);
        let record = RetentionRecord::warned("42", None, Utc::now());
        assert_eq!(phase_of(Some(&record)), Phase::Warned);
    }

    #[test]
    fn test_record_serializes_lowercase_phase() {
        let record = RetentionRecord::deleted("42", Some("Movie".to_string()), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phase"], "deleted");
        assert_eq!(json["title"], "Movie");
    }
}
