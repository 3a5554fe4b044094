use crate::error::{action_error, SourceError};
use crate::guid::ExternalIds;
use crate::arr::api::ArrHttpClient;
use crate::traits::{DeleteOutcome, DeletionSink};
use async_trait::async_trait;
use media_retention_models::{ItemKind, MediaItem};
use tracing::{info, warn};

/// Deletes movies through Radarr and series through Sonarr.
///
/// Either manager may be missing; items of that kind then fail with
/// `SourceError::NotConfigured` and stay where they are.
pub struct ArrDeleter {
    radarr: Option<ArrHttpClient>,
    sonarr: Option<ArrHttpClient>,
}

impl ArrDeleter {
    pub fn new(radarr: Option<ArrHttpClient>, sonarr: Option<ArrHttpClient>) -> Self {
        Self { radarr, sonarr }
    }

    fn manager_for(&self, kind: ItemKind) -> Option<&ArrHttpClient> {
        match kind {
            ItemKind::Movie => self.radarr.as_ref(),
            ItemKind::Series => self.sonarr.as_ref(),
        }
    }
}

#[async_trait]
impl DeletionSink for ArrDeleter {
    fn sink_name(&self) -> &str {
        "arr"
    }

    fn handles(&self, kind: ItemKind) -> bool {
        self.manager_for(kind).is_some()
    }

    async fn delete(&self, item: &MediaItem) -> Result<DeleteOutcome, SourceError> {
        let manager = match (item.kind, self.manager_for(item.kind)) {
            (_, Some(manager)) => manager,
            (ItemKind::Movie, None) => return Err(SourceError::NotConfigured("radarr".to_string())),
            (ItemKind::Series, None) => return Err(SourceError::NotConfigured("sonarr".to_string())),
        };

        let ids = ExternalIds::from_guids(&item.guids);
        let external_id = match item.kind {
            ItemKind::Movie => ids.tmdb_id.ok_or_else(|| {
                SourceError::action(format!("no TMDB id for movie '{}'", item.title))
            })?,
            ItemKind::Series => ids.tvdb_id.ok_or_else(|| {
                SourceError::action(format!("no TVDB id for series '{}'", item.title))
            })?,
        };

        let library_id = match manager.lookup_id(external_id).await.map_err(action_error)? {
            Some(id) => id,
            None => {
                warn!(
                    "{}: '{}' ({}) is not in the library, nothing to delete",
                    manager.kind().name(),
                    item.title,
                    external_id
                );
                return Ok(DeleteOutcome::AlreadyAbsent);
            }
        };

        if manager.delete(library_id).await.map_err(action_error)? {
            info!("{}: deleted '{}'", manager.kind().name(), item.title);
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arr::api::ArrKind;
    use chrono::Utc;
    use media_retention_models::Ratings;
    use std::collections::BTreeSet;

    fn movie(guids: &[&str]) -> MediaItem {
        MediaItem {
            item_id: "1".to_string(),
            kind: ItemKind::Movie,
            title: "The Matrix".to_string(),
            library_name: "Movies".to_string(),
            last_watched_at: Utc::now(),
            ratings: Ratings::new(),
            watch_fraction: 1.0,
            watchers: BTreeSet::new(),
            guids: guids.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_manager() {
        let deleter = ArrDeleter::new(None, None);
        assert!(!deleter.handles(ItemKind::Movie));
        let err = deleter.delete(&movie(&["tmdb://603"])).await.unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(name) if name == "radarr"));
    }

    #[tokio::test]
    async fn test_missing_external_id_is_an_action_error() {
        let radarr = ArrHttpClient::new(ArrKind::Radarr, "http://127.0.0.1:1", "key".to_string()).unwrap();
        let deleter = ArrDeleter::new(Some(radarr), None);
        assert!(deleter.handles(ItemKind::Movie));
        assert!(!deleter.handles(ItemKind::Series));
        let err = deleter.delete(&movie(&["imdb://tt0133093"])).await.unwrap_err();
        assert!(matches!(err, SourceError::Action(msg) if msg.contains("TMDB")));
    }
}
