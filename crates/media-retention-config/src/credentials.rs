use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_tautulli_api_key(&self) -> Option<&String> {
        self.get("tautulli_api_key")
    }

    pub fn set_tautulli_api_key(&mut self, key: String) {
        self.set("tautulli_api_key".to_string(), key);
    }

    pub fn get_plex_token(&self) -> Option<&String> {
        self.get("plex_token")
    }

    pub fn set_plex_token(&mut self, token: String) {
        self.set("plex_token".to_string(), token);
    }

    pub fn get_radarr_api_key(&self) -> Option<&String> {
        self.get("radarr_api_key")
    }

    pub fn set_radarr_api_key(&mut self, key: String) {
        self.set("radarr_api_key".to_string(), key);
    }

    pub fn get_sonarr_api_key(&self) -> Option<&String> {
        self.get("sonarr_api_key")
    }

    pub fn set_sonarr_api_key(&mut self, key: String) {
        self.set("sonarr_api_key".to_string(), key);
    }
}

/// Secrets for every downstream service, environment first, then the credential store.
#[derive(Clone)]
pub struct ServiceCredentials {
    pub tautulli_api_key: String,
    pub plex_token: String,
    pub radarr_api_key: Option<String>,
    pub sonarr_api_key: Option<String>,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("tautulli_api_key", &"***")
            .field("plex_token", &"***")
            .field("radarr_api_key", &self.radarr_api_key.as_ref().map(|_| "***"))
            .field("sonarr_api_key", &self.sonarr_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ServiceCredentials {
    pub fn from_env(store: &CredentialStore) -> Result<Self, ConfigError> {
        Self::resolve(store, |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(store: &CredentialStore, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &str, stored: Option<&String>| {
            lookup(env_key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| stored.filter(|v| !v.trim().is_empty()).cloned())
        };

        let tautulli_api_key = pick("TAUTULLI_API_KEY", store.get_tautulli_api_key())
            .ok_or(ConfigError::Missing("TAUTULLI_API_KEY"))?;
        let plex_token = pick("PLEX_TOKEN", store.get_plex_token())
            .ok_or(ConfigError::Missing("PLEX_TOKEN"))?;

        Ok(Self {
            tautulli_api_key,
            plex_token,
            radarr_api_key: pick("RADARR_API_KEY", store.get_radarr_api_key()),
            sonarr_api_key: pick("SONARR_API_KEY", store.get_sonarr_api_key()),
        })
    }
}
