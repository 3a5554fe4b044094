use crate::error::{fetch_error, SourceError};
use crate::guid::ExternalIds;
use crate::plex::api::{parse_activity_ratings, PlexGraphqlClient};
use crate::traits::RatingSource;
use async_trait::async_trait;
use media_retention_models::{MediaItem, Ratings};
use tracing::debug;

/// Per-user ratings from the Plex community activity feed.
pub struct PlexRatingSource {
    api: PlexGraphqlClient,
}

impl PlexRatingSource {
    pub fn new(api: PlexGraphqlClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RatingSource for PlexRatingSource {
    fn source_name(&self) -> &str {
        "plex"
    }

    async fn fetch_ratings(&self, item: &MediaItem) -> Result<Ratings, SourceError> {
        let metadata_id = ExternalIds::from_guids(&item.guids)
            .plex_metadata_id
            .ok_or_else(|| {
                SourceError::malformed(format!("'{}' has no plex:// guid to look ratings up by", item.title))
            })?;

        debug!("Plex: fetching ratings for '{}' ({})", item.title, metadata_id);
        let feed = self
            .api
            .get_activity_feed(&metadata_id)
            .await
            .map_err(fetch_error)?;
        parse_activity_ratings(&feed).map_err(|e| SourceError::Malformed(format!("{:#}", e)))
    }
}
