use crate::error::{fetch_error, SourceError};
use crate::plex::api::PlexServerHttpClient;
use crate::tautulli::api::TautulliHttpClient;
use crate::traits::HistorySource;
use async_trait::async_trait;
use media_retention_models::WatchEvent;
use tracing::{debug, info};

/// Watch history from Tautulli.
///
/// Tautulli rating keys are Plex rating keys, so series episode counts can be
/// asked of the Plex server directly when one is configured.
pub struct TautulliClient {
    api: TautulliHttpClient,
    history_length: u32,
    plex_server: Option<PlexServerHttpClient>,
}

impl TautulliClient {
    pub fn new(api: TautulliHttpClient, history_length: u32) -> Self {
        Self {
            api,
            history_length,
            plex_server: None,
        }
    }

    pub fn with_plex_server(mut self, plex_server: PlexServerHttpClient) -> Self {
        self.plex_server = Some(plex_server);
        self
    }
}

#[async_trait]
impl HistorySource for TautulliClient {
    fn source_name(&self) -> &str {
        "tautulli"
    }

    async fn fetch_watch_history(&self) -> Result<Vec<WatchEvent>, SourceError> {
        let events = self
            .api
            .get_history(self.history_length)
            .await
            .map_err(fetch_error)?;
        info!("Tautulli: fetched {} watch events", events.len());
        Ok(events)
    }

    async fn fetch_episode_count(&self, series_id: &str) -> Result<Option<u32>, SourceError> {
        match &self.plex_server {
            Some(server) => {
                let count = server.get_leaf_count(series_id).await.map_err(fetch_error)?;
                debug!("Plex: series {} has {:?} episodes", series_id, count);
                Ok(count)
            }
            None => Ok(None),
        }
    }

    async fn fetch_external_guids(&self, item_id: &str) -> Result<Vec<String>, SourceError> {
        self.api.get_metadata_guids(item_id).await.map_err(fetch_error)
    }
}
