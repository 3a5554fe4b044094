use thiserror::Error;

/// Failure reported by an adapter at the trait boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Service unreachable or returned an error status
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Service answered, but not with anything we can use
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A write (deletion, notification) did not go through
    #[error("action failed: {0}")]
    Action(String),

    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl SourceError {
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Self::Fetch(err.to_string())
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }

    pub fn action(err: impl std::fmt::Display) -> Self {
        Self::Action(err.to_string())
    }
}

/// Adapters build requests with `anyhow` context chains; keep the whole chain in the message.
pub(crate) fn fetch_error(err: anyhow::Error) -> SourceError {
    SourceError::Fetch(format!("{:#}", err))
}

pub(crate) fn action_error(err: anyhow::Error) -> SourceError {
    SourceError::Action(format!("{:#}", err))
}
