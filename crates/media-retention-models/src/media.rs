use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unit that retention acts on: a movie, or a whole series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Series,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Movie => write!(f, "movie"),
            ItemKind::Series => write!(f, "series"),
        }
    }
}

/// Latest known rating per user for one item (10-point scale).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Ratings(BTreeMap<String, f64>);

impl Ratings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record a user's rating, replacing whatever they said before.
    pub fn set(&mut self, user: impl Into<String>, rating: f64) {
        self.0.insert(user.into(), rating);
    }

    pub fn get(&self, user: &str) -> Option<f64> {
        self.0.get(user).copied()
    }

    /// Overlay `other` on top of these ratings; `other` wins per user.
    pub fn merge(&mut self, other: &Ratings) {
        for (user, rating) in &other.0 {
            self.0.insert(user.clone(), *rating);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(user, rating)| (user.as_str(), *rating))
    }

    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().sum::<f64>() / self.0.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.0.values().copied().fold(None, |acc, r| match acc {
            Some(m) if m >= r => Some(m),
            _ => Some(r),
        })
    }
}

impl<U: Into<String>> FromIterator<(U, f64)> for Ratings {
    fn from_iter<I: IntoIterator<Item = (U, f64)>>(iter: I) -> Self {
        let mut ratings = Ratings::new();
        for (user, rating) in iter {
            ratings.set(user, rating);
        }
        ratings
    }
}

/// Per-run aggregate of every watch event for one movie or series.
///
/// Rebuilt from history on every run and never persisted; only the
/// retention phase survives between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub item_id: String,
    pub kind: ItemKind,
    pub title: String,
    pub library_name: String,
    pub last_watched_at: DateTime<Utc>,
    pub ratings: Ratings,
    /// Movies: best completion seen. Series: fully watched episodes / total episodes.
    pub watch_fraction: f64,
    /// Everyone who watched it, for notification context
    pub watchers: BTreeSet<String>,
    /// Known external GUIDs (plex://, tmdb://, tvdb://, imdb://)
    #[serde(default)]
    pub guids: Vec<String>,
}

impl MediaItem {
    pub fn days_since_watch(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_watched_at).num_days()
    }

    pub fn add_guid(&mut self, guid: &str) {
        let guid = guid.split('?').next().unwrap_or(guid).trim();
        if !guid.is_empty() && !self.guids.iter().any(|g| g == guid) {
            self.guids.push(guid.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_overwrite_per_user() {
        let mut ratings = Ratings::new();
        ratings.set("bob", 8.0);
        ratings.set("bob", 3.0);
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings.get("bob"), Some(3.0));
    }

    #[test]
    fn test_ratings_mean_and_max() {
        let ratings: Ratings = [("alice", 5.0), ("bob", 8.0)].into_iter().collect();
        assert_eq!(ratings.mean(), Some(6.5));
        assert_eq!(ratings.max(), Some(8.0));
        assert_eq!(Ratings::new().mean(), None);
        assert_eq!(Ratings::new().max(), None);
    }

    #[test]
    fn test_ratings_merge_prefers_other() {
        let mut base: Ratings = [("alice", 5.0), ("bob", 4.0)].into_iter().collect();
        let fresh: Ratings = [("bob", 9.0)].into_iter().collect();
        base.merge(&fresh);
        assert_eq!(base.get("alice"), Some(5.0));
        assert_eq!(base.get("bob"), Some(9.0));
    }

    #[test]
    fn test_add_guid_strips_query_and_dedupes() {
        let mut item = MediaItem {
            item_id: "1".to_string(),
            kind: ItemKind::Movie,
            title: "Movie".to_string(),
            library_name: "Movies".to_string(),
            last_watched_at: Utc::now(),
            ratings: Ratings::new(),
            watch_fraction: 1.0,
            watchers: BTreeSet::new(),
            guids: Vec::new(),
        };
        item.add_guid("com.plexapp.agents.themoviedb://603?lang=en");
        item.add_guid("com.plexapp.agents.themoviedb://603");
        item.add_guid("");
        assert_eq!(item.guids, vec!["com.plexapp.agents.themoviedb://603".to_string()]);
    }
}
