use crate::error::ConfigError;
use crate::schedule::{parse_timezone, ResolvedSchedule, ScheduleTime};
use media_retention_models::{Policy, RatingMode, SeriesWatchMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tautulli: TautulliConfig,
    #[serde(default)]
    pub plex: PlexConfig,
    #[serde(default)]
    pub radarr: Option<ArrConfig>,
    #[serde(default)]
    pub sonarr: Option<ArrConfig>,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_days_delay_warning")]
    pub days_delay_warning: i64,
    #[serde(default = "default_days_delay_deletion")]
    pub days_delay_deletion: i64,
    #[serde(default = "default_true")]
    pub warn_before_delete: bool,
    #[serde(default = "default_rating_threshold")]
    pub rating_threshold: f64,
    #[serde(default = "default_rating_mode")]
    pub rating_mode: RatingMode,
    #[serde(default = "default_series_watch_mode")]
    pub series_watch_mode: SeriesWatchMode,
    #[serde(default)]
    pub excluded_libraries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Daily run time, "HH:MM"
    #[serde(default = "default_schedule_time")]
    pub schedule_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TautulliConfig {
    #[serde(default)]
    pub url: String,
    /// Number of history rows requested per run
    #[serde(default = "default_history_length")]
    pub history_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    #[serde(default = "default_plex_graphql_url")]
    pub graphql_url: String,
    /// Plex Media Server URL, used for series episode counts when set
    #[serde(default)]
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// JSON webhook receiving `{"content": "..."}` (Discord compatible)
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_days_delay_warning() -> i64 {
    30
}

fn default_days_delay_deletion() -> i64 {
    37
}

fn default_rating_threshold() -> f64 {
    6.5
}

fn default_rating_mode() -> RatingMode {
    RatingMode::Average
}

fn default_series_watch_mode() -> SeriesWatchMode {
    SeriesWatchMode::Full
}

fn default_schedule_time() -> String {
    "02:00".to_string()
}

fn default_timezone() -> String {
    std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string())
}

fn default_history_length() -> u32 {
    5000
}

pub fn default_plex_graphql_url() -> String {
    "https://metadata.provider.plex.tv/graphql".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            dry_run: default_true(),
            days_delay_warning: default_days_delay_warning(),
            days_delay_deletion: default_days_delay_deletion(),
            warn_before_delete: default_true(),
            rating_threshold: default_rating_threshold(),
            rating_mode: default_rating_mode(),
            series_watch_mode: default_series_watch_mode(),
            excluded_libraries: Vec::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_time: default_schedule_time(),
            timezone: default_timezone(),
            run_on_startup: default_true(),
        }
    }
}

impl Default for TautulliConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            history_length: default_history_length(),
        }
    }
}

impl Default for PlexConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_plex_graphql_url(),
            server_url: None,
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_days(key: &'static str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|e| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a comma separated library list, dropping blanks.
pub fn parse_library_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|lib| lib.trim().to_lowercase())
        .filter(|lib| !lib.is_empty())
        .collect()
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if present (defaults otherwise), then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; the process environment in production.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(v) = get("DRY_RUN") {
            self.policy.dry_run = parse_bool("DRY_RUN", &v)?;
        }
        // DAYS_DELAY alone selects the one-phase setup; WARN_BEFORE_DELETE below can still re-enable warnings
        if let Some(v) = get("DAYS_DELAY") {
            self.policy.days_delay_deletion = parse_days("DAYS_DELAY", &v)?;
            if get("DAYS_DELAY_WARNING").is_none() {
                self.policy.warn_before_delete = false;
            }
        }
        if let Some(v) = get("DAYS_DELAY_WARNING") {
            self.policy.days_delay_warning = parse_days("DAYS_DELAY_WARNING", &v)?;
        }
        if let Some(v) = get("DAYS_DELAY_DELETION") {
            self.policy.days_delay_deletion = parse_days("DAYS_DELAY_DELETION", &v)?;
        }
        if let Some(v) = get("WARN_BEFORE_DELETE") {
            self.policy.warn_before_delete = parse_bool("WARN_BEFORE_DELETE", &v)?;
        }
        if let Some(v) = get("RATING_THRESHOLD") {
            self.policy.rating_threshold =
                v.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                    key: "RATING_THRESHOLD",
                    value: v.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(v) = get("RATING_MODE") {
            self.policy.rating_mode = v.parse()?;
        }
        if let Some(v) = get("SERIES_WATCH_MODE") {
            self.policy.series_watch_mode = v.parse()?;
        }
        if let Some(v) = lookup("EXCLUDED_LIBRARIES") {
            self.policy.excluded_libraries = parse_library_list(&v);
        }
        if let Some(v) = get("CRON_SCHEDULE") {
            self.scheduler.schedule_time = v;
        }
        if let Some(v) = get("TZ") {
            self.scheduler.timezone = v;
        }
        if let Some(v) = get("TAUTULLI_URL") {
            self.tautulli.url = v;
        }
        if let Some(v) = get("PLEX_SERVER_URL") {
            self.plex.server_url = Some(v);
        }
        if let Some(v) = get("RADARR_URL") {
            self.radarr = Some(ArrConfig { url: v });
        }
        if let Some(v) = get("SONARR_URL") {
            self.sonarr = Some(ArrConfig { url: v });
        }
        if let Some(v) = get("NOTIFY_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(v);
        }
        Ok(())
    }

    /// Build the immutable run policy, rejecting inconsistent settings.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        let p = &self.policy;

        if !p.rating_threshold.is_finite() || p.rating_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "rating_threshold",
                value: p.rating_threshold.to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        if p.days_delay_warning < 0 {
            return Err(ConfigError::InvalidValue {
                key: "days_delay_warning",
                value: p.days_delay_warning.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if p.days_delay_deletion < 0 {
            return Err(ConfigError::InvalidValue {
                key: "days_delay_deletion",
                value: p.days_delay_deletion.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        if p.warn_before_delete && p.days_delay_deletion <= p.days_delay_warning {
            return Err(ConfigError::DelayOrdering {
                warning: p.days_delay_warning,
                deletion: p.days_delay_deletion,
            });
        }

        Ok(Policy {
            dry_run: p.dry_run,
            rating_threshold: p.rating_threshold,
            rating_mode: p.rating_mode,
            series_watch_mode: p.series_watch_mode,
            days_delay_warning: p.days_delay_warning,
            days_delay_deletion: p.days_delay_deletion,
            warn_before_delete: p.warn_before_delete,
            excluded_libraries: p
                .excluded_libraries
                .iter()
                .map(|lib| lib.trim().to_lowercase())
                .filter(|lib| !lib.is_empty())
                .collect(),
        })
    }

    pub fn schedule(&self) -> Result<ResolvedSchedule, ConfigError> {
        Ok(ResolvedSchedule {
            time: self.scheduler.schedule_time.parse::<ScheduleTime>()?,
            timezone: parse_timezone(&self.scheduler.timezone)?,
            run_on_startup: self.scheduler.run_on_startup,
        })
    }

    /// Full startup validation, minus credentials (see `ServiceCredentials::resolve`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy()?;
        self.schedule()?;
        if self.tautulli.url.trim().is_empty() {
            return Err(ConfigError::Missing("tautulli.url (TAUTULLI_URL)"));
        }
        if self.tautulli.history_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tautulli.history_length",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.tautulli.url = "http://tautulli:8181".to_string();
        config.scheduler.timezone = "UTC".to_string();
        config
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = valid_config();
        config.policy.rating_mode = RatingMode::AnyHigh;
        config.policy.excluded_libraries = vec!["Kids".to_string()];
        config.radarr = Some(ArrConfig { url: "http://radarr:7878".to_string() });

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.policy.rating_mode, RatingMode::AnyHigh);
        assert_eq!(loaded.policy.excluded_libraries, vec!["Kids".to_string()]);
        assert_eq!(loaded.radarr.unwrap().url, "http://radarr:7878");
        assert!(loaded.sonarr.is_none());
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.policy.dry_run);
        assert_eq!(config.policy.rating_threshold, 6.5);
        assert_eq!(config.policy.rating_mode, RatingMode::Average);
        assert_eq!(config.policy.series_watch_mode, SeriesWatchMode::Full);
        assert_eq!(config.scheduler.schedule_time, "02:00");
        assert_eq!(config.tautulli.history_length, 5000);
    }

    #[test]
    fn test_unknown_mode_in_file_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[policy]\nrating_mode = \"median\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = valid_config();
        let vars = env(&[
            ("DRY_RUN", "false"),
            ("DAYS_DELAY_WARNING", "10"),
            ("DAYS_DELAY_DELETION", "20"),
            ("RATING_THRESHOLD", "7.25"),
            ("RATING_MODE", "any_high"),
            ("SERIES_WATCH_MODE", "Bored"),
            ("EXCLUDED_LIBRARIES", " Kids , Anime,,"),
            ("CRON_SCHEDULE", "04:30"),
            ("SONARR_URL", "http://sonarr:8989"),
        ]);
        config.apply_overrides_from(|k| vars.get(k).cloned()).unwrap();

        let policy = config.policy().unwrap();
        assert!(!policy.dry_run);
        assert_eq!(policy.days_delay_warning, 10);
        assert_eq!(policy.days_delay_deletion, 20);
        assert_eq!(policy.rating_threshold, 7.25);
        assert_eq!(policy.rating_mode, RatingMode::AnyHigh);
        assert_eq!(policy.series_watch_mode, SeriesWatchMode::Bored);
        assert!(policy.is_library_excluded("kids"));
        assert!(policy.is_library_excluded("ANIME"));
        assert_eq!(policy.excluded_libraries.len(), 2);
        assert_eq!(config.scheduler.schedule_time, "04:30");
        assert_eq!(config.sonarr.unwrap().url, "http://sonarr:8989");
    }

    #[test]
    fn test_days_delay_alone_means_single_phase() {
        let mut config = valid_config();
        let vars = env(&[("DAYS_DELAY", "30")]);
        config.apply_overrides_from(|k| vars.get(k).cloned()).unwrap();

        let policy = config.policy().unwrap();
        assert!(!policy.warn_before_delete);
        assert_eq!(policy.days_delay_deletion, 30);

        let mut config = valid_config();
        let vars = env(&[("DAYS_DELAY", "14"), ("DAYS_DELAY_WARNING", "7")]);
        config.apply_overrides_from(|k| vars.get(k).cloned()).unwrap();
        let policy = config.policy().unwrap();
        assert!(policy.warn_before_delete);
        assert_eq!((policy.days_delay_warning, policy.days_delay_deletion), (7, 14));
    }

    #[test]
    fn test_env_override_rejects_unknown_mode() {
        let mut config = valid_config();
        let vars = env(&[("RATING_MODE", "median")]);
        let err = config.apply_overrides_from(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMode(_)));
    }

    #[test]
    fn test_env_override_rejects_bad_bool() {
        let mut config = valid_config();
        let vars = env(&[("DRY_RUN", "maybe")]);
        assert!(config.apply_overrides_from(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_delay_ordering_enforced() {
        let mut config = valid_config();
        config.policy.days_delay_warning = 30;
        config.policy.days_delay_deletion = 30;
        assert!(matches!(
            config.policy(),
            Err(ConfigError::DelayOrdering { warning: 30, deletion: 30 })
        ));

        // Without a warning phase only the deletion delay matters
        config.policy.warn_before_delete = false;
        assert!(config.policy().is_ok());
    }

    #[test]
    fn test_validate_requires_tautulli_url() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());
        config.tautulli.url = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_validate_rejects_bad_schedule() {
        let mut config = valid_config();
        config.scheduler.schedule_time = "2 o'clock".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidScheduleTime(_))));

        let mut config = valid_config();
        config.scheduler.timezone = "Nowhere/City".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = valid_config();
        config.policy.rating_threshold = -1.0;
        assert!(matches!(config.policy(), Err(ConfigError::InvalidValue { key: "rating_threshold", .. })));
    }
}
