//! Builds the collaborator trait objects from configuration.

use crate::arr::{ArrDeleter, ArrHttpClient, ArrKind};
use crate::notify::{LogNotifier, WebhookNotifier};
use crate::plex::api::{PlexGraphqlClient, PlexServerHttpClient};
use crate::plex::PlexRatingSource;
use crate::tautulli::api::TautulliHttpClient;
use crate::tautulli::TautulliClient;
use crate::traits::{DeletionSink, HistorySource, NotificationSink, RatingSource};
use anyhow::{Context, Result};
use media_retention_config::{ArrConfig, Config, ServiceCredentials};
use std::sync::Arc;
use tracing::{debug, warn};

/// Every external collaborator a retention run talks to.
#[derive(Clone)]
pub struct Adapters {
    pub history: Arc<dyn HistorySource>,
    pub ratings: Arc<dyn RatingSource>,
    pub deleter: Arc<dyn DeletionSink>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl Adapters {
    pub fn from_config(config: &Config, credentials: &ServiceCredentials) -> Result<Self> {
        let tautulli_api = TautulliHttpClient::new(&config.tautulli.url, credentials.tautulli_api_key.clone())
            .context("Failed to set up Tautulli client")?;
        let mut history = TautulliClient::new(tautulli_api, config.tautulli.history_length);
        if let Some(server_url) = &config.plex.server_url {
            debug!("Using Plex server {} for episode counts", server_url);
            history = history.with_plex_server(
                PlexServerHttpClient::new(&credentials.plex_token, server_url)
                    .context("Failed to set up Plex server client")?,
            );
        }

        let graphql = PlexGraphqlClient::new(&credentials.plex_token, config.plex.graphql_url.clone())
            .context("Failed to set up Plex GraphQL client")?;

        let radarr = build_arr(ArrKind::Radarr, config.radarr.as_ref(), credentials.radarr_api_key.as_ref())?;
        let sonarr = build_arr(ArrKind::Sonarr, config.sonarr.as_ref(), credentials.sonarr_api_key.as_ref())?;
        if radarr.is_none() && sonarr.is_none() {
            warn!("Neither Radarr nor Sonarr is configured; deletions will fail");
        }

        let notifier: Arc<dyn NotificationSink> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone()).context("Failed to set up webhook notifier")?),
            None => Arc::new(LogNotifier),
        };

        Ok(Self {
            history: Arc::new(history),
            ratings: Arc::new(PlexRatingSource::new(graphql)),
            deleter: Arc::new(ArrDeleter::new(radarr, sonarr)),
            notifier,
        })
    }
}

fn build_arr(kind: ArrKind, config: Option<&ArrConfig>, api_key: Option<&String>) -> Result<Option<ArrHttpClient>> {
    match (config, api_key) {
        (None, _) => Ok(None),
        (Some(_), None) => Err(anyhow::anyhow!(
            "{} url is configured but no API key was found; set {}_API_KEY",
            kind.name(),
            kind.name().to_uppercase()
        )),
        (Some(config), Some(key)) => ArrHttpClient::new(kind, &config.url, key.clone())
            .map(Some)
            .with_context(|| format!("Failed to set up {} client", kind.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_retention_models::ItemKind;

    fn credentials() -> ServiceCredentials {
        ServiceCredentials {
            tautulli_api_key: "tautulli".to_string(),
            plex_token: "plex".to_string(),
            radarr_api_key: Some("radarr".to_string()),
            sonarr_api_key: None,
        }
    }

    #[test]
    fn test_builds_with_defaults() {
        let mut config = Config::default();
        config.tautulli.url = "http://tautulli:8181".to_string();
        let adapters = Adapters::from_config(&config, &credentials()).unwrap();
        assert_eq!(adapters.history.source_name(), "tautulli");
        assert_eq!(adapters.ratings.source_name(), "plex");
        assert_eq!(adapters.notifier.sink_name(), "log");
        assert!(!adapters.deleter.handles(ItemKind::Movie));
    }

    #[test]
    fn test_arr_needs_api_key() {
        let mut config = Config::default();
        config.tautulli.url = "http://tautulli:8181".to_string();
        config.radarr = Some(ArrConfig { url: "http://radarr:7878".to_string() });
        config.notifications.webhook_url = Some("http://hooks.local/abc".to_string());
        let adapters = Adapters::from_config(&config, &credentials()).unwrap();
        assert!(adapters.deleter.handles(ItemKind::Movie));
        assert!(!adapters.deleter.handles(ItemKind::Series));
        assert_eq!(adapters.notifier.sink_name(), "webhook");

        config.sonarr = Some(ArrConfig { url: "http://sonarr:8989".to_string() });
        let err = Adapters::from_config(&config, &credentials()).err().unwrap();
        assert!(err.to_string().contains("SONARR_API_KEY"));
    }
}
