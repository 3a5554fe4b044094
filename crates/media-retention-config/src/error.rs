use media_retention_models::UnknownModeError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that makes the configuration unusable. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    UnknownMode(#[from] UnknownModeError),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("days_delay_deletion ({deletion}) must be greater than days_delay_warning ({warning})")]
    DelayOrdering { warning: i64, deletion: i64 },

    #[error("invalid schedule time '{0}' (expected HH:MM)")]
    InvalidScheduleTime(String),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}
