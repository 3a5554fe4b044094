use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use media_retention_models::{MediaType, WatchEvent};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

const HISTORY_TIMEOUT: Duration = Duration::from_secs(60);
const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

pub struct TautulliHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TautulliHttpClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Call a Tautulli v2 command and return `response.data`.
    async fn call(&self, cmd: &str, params: &[(&str, String)], timeout: Duration) -> Result<Value> {
        let url = format!("{}/api/v2", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("apikey", self.api_key.clone()), ("cmd", cmd.to_string())];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&url)
            .query(&query)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to call Tautulli {}", cmd))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Tautulli {} returned {}", cmd, status));
        }

        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Tautulli {} response", cmd))?;

        unwrap_response(cmd, json)
    }

    pub async fn get_history(&self, length: u32) -> Result<Vec<WatchEvent>> {
        let data = self
            .call("get_history", &[("length", length.to_string())], HISTORY_TIMEOUT)
            .await?;
        let rows = data
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("Tautulli history response has no data array"))?;

        let events: Vec<WatchEvent> = rows.iter().filter_map(parse_history_row).collect();
        debug!(
            "Tautulli: {} history rows, {} usable watch events",
            rows.len(),
            events.len()
        );
        Ok(events)
    }

    pub async fn get_metadata_guids(&self, rating_key: &str) -> Result<Vec<String>> {
        let data = self
            .call("get_metadata", &[("rating_key", rating_key.to_string())], METADATA_TIMEOUT)
            .await?;
        Ok(parse_metadata_guids(&data))
    }
}

fn unwrap_response(cmd: &str, json: Value) -> Result<Value> {
    let response = json
        .get("response")
        .ok_or_else(|| anyhow::anyhow!("Tautulli {} response has no 'response' object", cmd))?;

    let result = response.get("result").and_then(Value::as_str).unwrap_or("");
    if result != "success" {
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(anyhow::anyhow!("Tautulli {} failed: {}", cmd, message));
    }

    response
        .get("data")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Tautulli {} response has no data", cmd))
}

/// Tautulli sends ids as numbers or strings, and "" for missing values.
fn value_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unix_to_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let secs = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Turn one history row into a watch event. Rows for other media types are dropped.
pub fn parse_history_row(row: &Value) -> Option<WatchEvent> {
    let media_type = match row.get("media_type").and_then(Value::as_str)? {
        "movie" => MediaType::Movie,
        "episode" => MediaType::Episode,
        other => {
            trace!("Tautulli: skipping history row with media_type {}", other);
            return None;
        }
    };

    let item_id = value_to_string(row.get("rating_key"))?;
    let watched_at = unix_to_datetime(row.get("date"))?;
    let user = value_to_string(row.get("user"))
        .or_else(|| value_to_string(row.get("friendly_name")))
        .unwrap_or_else(|| "unknown".to_string());
    let library_name = value_to_string(row.get("library_name")).unwrap_or_default();
    let completion = value_to_f64(row.get("watched_status")).unwrap_or(0.0);

    let (parent_id, parent_title, parent_guid) = match media_type {
        MediaType::Episode => (
            Some(value_to_string(row.get("grandparent_rating_key"))?),
            value_to_string(row.get("grandparent_title")),
            value_to_string(row.get("grandparent_guid")),
        ),
        MediaType::Movie => (None, None, None),
    };

    Some(WatchEvent {
        item_id,
        media_type,
        parent_id,
        title: value_to_string(row.get("full_title")).or_else(|| value_to_string(row.get("title"))),
        parent_title,
        user,
        rating: None,
        watched_at,
        completion,
        library_name,
        guid: value_to_string(row.get("guid")),
        parent_guid,
    })
}

pub fn parse_metadata_guids(data: &Value) -> Vec<String> {
    let mut guids: Vec<String> = data
        .get("guids")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|g| value_to_string(Some(g))).collect())
        .unwrap_or_default();
    if let Some(guid) = value_to_string(data.get("guid")) {
        if !guids.contains(&guid) {
            guids.push(guid);
        }
    }
    guids
}
