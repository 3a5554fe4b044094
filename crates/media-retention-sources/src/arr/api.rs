use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which library manager an `ArrHttpClient` talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrKind {
    /// Movies, looked up by TMDB id
    Radarr,
    /// Series, looked up by TVDB id
    Sonarr,
}

impl ArrKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArrKind::Radarr => "radarr",
            ArrKind::Sonarr => "sonarr",
        }
    }

    fn resource(&self) -> &'static str {
        match self {
            ArrKind::Radarr => "movie",
            ArrKind::Sonarr => "series",
        }
    }

    fn lookup_param(&self) -> &'static str {
        match self {
            ArrKind::Radarr => "tmdbId",
            ArrKind::Sonarr => "tvdbId",
        }
    }

    fn delete_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ArrKind::Radarr => &[("deleteFiles", "true"), ("addImportExclusion", "false")],
            ArrKind::Sonarr => &[("deleteFiles", "true")],
        }
    }
}

/// Radarr/Sonarr v3 API: the two share the lookup-then-delete shape.
pub struct ArrHttpClient {
    client: Client,
    kind: ArrKind,
    base_url: String,
    api_key: String,
}

impl ArrHttpClient {
    pub fn new(kind: ArrKind, base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn kind(&self) -> ArrKind {
        self.kind
    }

    /// Internal library id for an external id, if the manager has the item.
    pub async fn lookup_id(&self, external_id: u32) -> Result<Option<u64>> {
        let url = format!("{}/api/v3/{}", self.base_url, self.kind.resource());
        let response = self
            .client
            .get(&url)
            .query(&[(self.kind.lookup_param(), external_id.to_string())])
            .header("X-Api-Key", &self.api_key)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to look up {} {}", self.kind.name(), external_id))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "{} lookup returned {}",
                self.kind.name(),
                response.status()
            ));
        }

        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} lookup response", self.kind.name()))?;
        let id = parse_lookup_id(&json)?;
        debug!("{}: {}={} -> {:?}", self.kind.name(), self.kind.lookup_param(), external_id, id);
        Ok(id)
    }

    /// Delete an item and its files. A 404 means someone beat us to it.
    pub async fn delete(&self, library_id: u64) -> Result<bool> {
        let url = format!("{}/api/v3/{}/{}", self.base_url, self.kind.resource(), library_id);
        info!("{}: deleting {} {} with files", self.kind.name(), self.kind.resource(), library_id);

        let response = self
            .client
            .delete(&url)
            .query(self.kind.delete_params())
            .header("X-Api-Key", &self.api_key)
            .timeout(DELETE_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to delete {} {}", self.kind.resource(), library_id))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "{} delete returned {}",
                self.kind.name(),
                response.status()
            ));
        }
        Ok(true)
    }
}

/// `id` of the first entry of a lookup response; an empty list means not in the library.
pub fn parse_lookup_id(json: &Value) -> Result<Option<u64>> {
    let entries = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("lookup response is not a list"))?;
    match entries.first() {
        None => Ok(None),
        Some(entry) => entry
            .get("id")
            .and_then(Value::as_u64)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("lookup entry has no numeric id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_lookup_id() {
        assert_eq!(parse_lookup_id(&json!([{"id": 12, "title": "The Matrix"}])).unwrap(), Some(12));
        assert_eq!(parse_lookup_id(&json!([])).unwrap(), None);
        assert!(parse_lookup_id(&json!({"id": 12})).is_err());
        assert!(parse_lookup_id(&json!([{"title": "no id"}])).is_err());
    }

    #[test]
    fn test_kind_endpoints() {
        assert_eq!(ArrKind::Radarr.resource(), "movie");
        assert_eq!(ArrKind::Radarr.lookup_param(), "tmdbId");
        assert_eq!(ArrKind::Sonarr.resource(), "series");
        assert_eq!(ArrKind::Sonarr.lookup_param(), "tvdbId");
        assert!(ArrKind::Radarr
            .delete_params()
            .contains(&("addImportExclusion", "false")));
    }
}
