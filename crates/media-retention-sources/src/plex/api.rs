use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use media_retention_models::Ratings;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(20);
const SERVER_TIMEOUT: Duration = Duration::from_secs(15);

const ACTIVITY_RATINGS_QUERY: &str = r#"
query GetActivityFeed($metadataID: ID!) {
  activityFeed(
    first: 100
    types: [RATING, WATCH_RATING]
    includeDescendants: true
    metadataID: $metadataID
  ) {
    nodes {
      date
      userV2 {
        id
        username
      }
      ... on ActivityRating {
        rating
      }
      ... on ActivityWatchRating {
        rating
      }
    }
  }
}
"#;

fn build_client(token: &str) -> Result<Client> {
    Client::builder()
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static("application/json"),
            );
            headers.insert(
                reqwest::header::HeaderName::from_static("x-plex-token"),
                reqwest::header::HeaderValue::from_str(token).context("Invalid token format")?,
            );
            headers.insert(
                reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                reqwest::header::HeaderValue::from_static("starcleaner"),
            );
            headers
        })
        .build()
        .context("Failed to create HTTP client")
}

/// Plex community GraphQL endpoint (per-user ratings).
pub struct PlexGraphqlClient {
    client: Client,
    graphql_url: String,
}

impl PlexGraphqlClient {
    pub fn new(token: &str, graphql_url: String) -> Result<Self> {
        Ok(Self {
            client: build_client(token)?,
            graphql_url,
        })
    }

    /// Raw activity feed response; see `parse_activity_ratings`.
    pub async fn get_activity_feed(&self, metadata_id: &str) -> Result<Value> {
        let body = json!({
            "query": ACTIVITY_RATINGS_QUERY,
            "variables": { "metadataID": metadata_id },
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .timeout(GRAPHQL_TIMEOUT)
            .send()
            .await
            .context("Failed to query Plex activity feed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Plex GraphQL returned {}", status));
        }

        response
            .json()
            .await
            .context("Failed to parse Plex activity feed response")
    }
}

/// Latest rating per user from an activity feed response.
///
/// Nodes without a rating are ignored. Nodes without a user get a positional name so
/// that anonymous ratings still count.
pub fn parse_activity_ratings(json: &Value) -> Result<Ratings> {
    if let Some(errors) = json.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors[0]
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow::anyhow!("Plex GraphQL error: {}", message));
        }
    }

    let nodes = match json
        .get("data")
        .and_then(|d| d.get("activityFeed"))
        .and_then(|f| f.get("nodes"))
    {
        Some(Value::Array(nodes)) => nodes,
        Some(Value::Null) | None => return Ok(Ratings::new()),
        Some(other) => return Err(anyhow::anyhow!("activityFeed.nodes is not a list: {}", other)),
    };

    let mut latest: HashMap<String, (Option<DateTime<Utc>>, f64)> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        let rating = match node.get("rating") {
            None | Some(Value::Null) => continue,
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("rating is not a number: {}", n))?,
            Some(other) => return Err(anyhow::anyhow!("rating is not a number: {}", other)),
        };

        let user = node
            .get("userV2")
            .and_then(|u| u.get("username").or_else(|| u.get("id")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("anonymous-{}", index));

        let date = node
            .get("date")
            .and_then(Value::as_str)
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));

        // Feed is newest first; only a strictly newer dated node replaces an earlier pick
        match latest.get(&user) {
            Some((Some(seen), _)) if date.map_or(true, |d| d <= *seen) => {}
            Some((None, _)) if date.is_none() => {}
            _ => {
                latest.insert(user, (date, rating));
            }
        }
    }

    debug!("Plex: parsed {} user rating(s)", latest.len());
    Ok(latest
        .into_iter()
        .map(|(user, (_, rating))| (user, rating))
        .collect())
}

/// Direct access to a Plex Media Server library.
pub struct PlexServerHttpClient {
    client: Client,
    server_url: String,
}

impl PlexServerHttpClient {
    pub fn new(token: &str, server_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(token)?,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// Number of episodes (leaves) under a show.
    pub async fn get_leaf_count(&self, rating_key: &str) -> Result<Option<u32>> {
        let url = format!("{}/library/metadata/{}", self.server_url, rating_key);
        let response = self
            .client
            .get(&url)
            .timeout(SERVER_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to get Plex metadata for {}", rating_key))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Plex server returned {}", response.status()));
        }

        let json: Value = response
            .json()
            .await
            .context("Failed to parse Plex metadata response")?;
        Ok(parse_leaf_count(&json))
    }
}

pub fn parse_leaf_count(json: &Value) -> Option<u32> {
    json.get("MediaContainer")
        .and_then(|c| c.get("Metadata"))
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("leafCount"))
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activity_ratings() {
        let json = json!({
            "data": { "activityFeed": { "nodes": [
                { "date": "2024-05-02T10:00:00Z", "userV2": { "id": "1", "username": "alice" }, "rating": 5.0 },
                { "date": "2024-05-01T10:00:00Z", "userV2": { "id": "2", "username": "bob" }, "rating": 8 },
                { "date": "2024-05-01T09:00:00Z", "userV2": { "id": "3", "username": "carol" }, "rating": null }
            ]}}
        });
        let ratings = parse_activity_ratings(&json).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings.get("alice"), Some(5.0));
        assert_eq!(ratings.get("bob"), Some(8.0));
        assert_eq!(ratings.get("carol"), None);
    }

    #[test]
    fn test_latest_rating_per_user_wins() {
        let json = json!({
            "data": { "activityFeed": { "nodes": [
                { "date": "2024-05-01T10:00:00Z", "userV2": { "username": "bob" }, "rating": 3 },
                { "date": "2024-06-01T10:00:00Z", "userV2": { "username": "bob" }, "rating": 9 },
                { "date": "2024-04-01T10:00:00Z", "userV2": { "username": "bob" }, "rating": 1 }
            ]}}
        });
        let ratings = parse_activity_ratings(&json).unwrap();
        assert_eq!(ratings.get("bob"), Some(9.0));
    }

    #[test]
    fn test_empty_feed_is_no_ratings() {
        assert!(parse_activity_ratings(&json!({"data": {"activityFeed": null}})).unwrap().is_empty());
        assert!(parse_activity_ratings(&json!({"data": {"activityFeed": {"nodes": []}}})).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_rating_is_an_error() {
        let json = json!({"data": {"activityFeed": {"nodes": [{"rating": "ten"}]}}});
        assert!(parse_activity_ratings(&json).is_err());

        let json = json!({"errors": [{"message": "unauthorized"}]});
        let err = parse_activity_ratings(&json).unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn test_parse_leaf_count() {
        let json = json!({"MediaContainer": {"Metadata": [{"ratingKey": "500", "leafCount": 62}]}});
        assert_eq!(parse_leaf_count(&json), Some(62));
        assert_eq!(parse_leaf_count(&json!({"MediaContainer": {}})), None);
    }
}
