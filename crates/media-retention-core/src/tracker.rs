use chrono::{DateTime, Utc};
use media_retention_models::{
    phase_of, ItemKind, MediaItem, MediaType, Phase, Policy, Ratings, RetentionRecord, WatchEvent,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Where an item stands this run, before any rating is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidacy {
    /// Lives in an excluded library
    Excluded,
    /// Already deleted on an earlier run
    Tombstoned,
    /// Watched too recently for the next step
    NotDue { days_since_watch: i64 },
    Warning,
    Deletion,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct EpisodeTally {
    seen: BTreeSet<String>,
    watched: BTreeSet<String>,
}

/// One movie or series as seen this run, with its phase at run start.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    pub item: MediaItem,
    pub phase: Phase,
    episodes: Option<EpisodeTally>,
}

impl TrackedItem {
    /// Replace the episode denominator with the series' real episode count.
    pub fn set_episode_total(&mut self, total: u32) {
        if let Some(tally) = &self.episodes {
            if total > 0 {
                self.item.watch_fraction = (tally.watched.len() as f64 / total as f64).min(1.0);
            }
        }
    }

    /// Distinct fully watched episodes, for series.
    pub fn watched_episodes(&self) -> Option<usize> {
        self.episodes.as_ref().map(|t| t.watched.len())
    }

    /// Warning and deletion candidacy under `policy` at `now`.
    ///
    /// Elapsed time runs from the last watch, so a re-watch after a warning
    /// pushes the item back out of deletion candidacy.
    pub fn candidacy(&self, policy: &Policy, now: DateTime<Utc>) -> Candidacy {
        if policy.is_library_excluded(&self.item.library_name) {
            return Candidacy::Excluded;
        }

        let days_since_watch = self.item.days_since_watch(now);
        match self.phase {
            Phase::Deleted => Candidacy::Tombstoned,
            Phase::Unseen if policy.warn_before_delete => {
                if days_since_watch >= policy.days_delay_warning {
                    Candidacy::Warning
                } else {
                    Candidacy::NotDue { days_since_watch }
                }
            }
            Phase::Unseen | Phase::Warned => {
                if days_since_watch >= policy.days_delay_deletion {
                    Candidacy::Deletion
                } else {
                    Candidacy::NotDue { days_since_watch }
                }
            }
        }
    }
}

struct Accumulator {
    item: MediaItem,
    rated_at: HashMap<String, DateTime<Utc>>,
    episodes: Option<EpisodeTally>,
}

impl Accumulator {
    fn new(id: &str, kind: ItemKind, event: &WatchEvent) -> Self {
        let title = match kind {
            ItemKind::Movie => event.title.clone(),
            ItemKind::Series => event.parent_title.clone().or_else(|| event.title.clone()),
        }
        .unwrap_or_else(|| id.to_string());

        Self {
            item: MediaItem {
                item_id: id.to_string(),
                kind,
                title,
                library_name: event.library_name.clone(),
                last_watched_at: event.watched_at,
                ratings: Ratings::new(),
                watch_fraction: 0.0,
                watchers: BTreeSet::new(),
                guids: Vec::new(),
            },
            rated_at: HashMap::new(),
            episodes: match kind {
                ItemKind::Movie => None,
                ItemKind::Series => Some(EpisodeTally::default()),
            },
        }
    }

    fn add(&mut self, event: &WatchEvent) {
        let item = &mut self.item;
        if event.watched_at > item.last_watched_at {
            item.last_watched_at = event.watched_at;
            item.library_name = event.library_name.clone();
        }
        item.watchers.insert(event.user.clone());

        if let Some(rating) = event.rating {
            let newer = self
                .rated_at
                .get(&event.user)
                .map_or(true, |at| event.watched_at >= *at);
            if newer {
                self.rated_at.insert(event.user.clone(), event.watched_at);
                item.ratings.set(event.user.clone(), rating);
            }
        }

        match &mut self.episodes {
            None => {
                if let Some(guid) = &event.guid {
                    item.add_guid(guid);
                }
                item.watch_fraction = item.watch_fraction.max(event.completion.clamp(0.0, 1.0));
            }
            Some(tally) => {
                if let Some(guid) = &event.parent_guid {
                    item.add_guid(guid);
                }
                tally.seen.insert(event.item_id.clone());
                if event.is_fully_watched() {
                    tally.watched.insert(event.item_id.clone());
                }
                item.watch_fraction = tally.watched.len() as f64 / tally.seen.len() as f64;
            }
        }
    }
}

/// Collapse watch events into one tracked item per movie or series.
///
/// Episodes roll up to their series. The phase comes from `records`; an item
/// with no record is `Unseen`. Items come back oldest last watch first.
pub fn track(events: &[WatchEvent], records: &BTreeMap<String, RetentionRecord>) -> Vec<TrackedItem> {
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();

    for event in events {
        let (id, kind) = match (event.media_type, &event.parent_id) {
            (MediaType::Movie, _) => (event.item_id.as_str(), ItemKind::Movie),
            (MediaType::Episode, Some(parent_id)) => (parent_id.as_str(), ItemKind::Series),
            (MediaType::Episode, None) => {
                trace!("Episode {} has no series id, ignoring", event.item_id);
                continue;
            }
        };
        if id.is_empty() {
            continue;
        }

        accumulators
            .entry(id.to_string())
            .or_insert_with(|| Accumulator::new(id, kind, event))
            .add(event);
    }

    let mut tracked: Vec<TrackedItem> = accumulators
        .into_values()
        .map(|acc| TrackedItem {
            phase: phase_of(records.get(&acc.item.item_id)),
            item: acc.item,
            episodes: acc.episodes,
        })
        .collect();

    tracked.sort_by(|a, b| {
        a.item
            .last_watched_at
            .cmp(&b.item.last_watched_at)
            .then_with(|| a.item.item_id.cmp(&b.item.item_id))
    });

    debug!("Tracked {} unique items from {} watch events", tracked.len(), events.len());
    tracked
}
