use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownModeError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// How several users' ratings combine into one keep/delete answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RatingMode {
    /// Eligible when the mean rating is below the threshold
    Average,
    /// Eligible only when nobody rated at or above the threshold
    AnyHigh,
}

impl FromStr for RatingMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(RatingMode::Average),
            "any_high" => Ok(RatingMode::AnyHigh),
            other => Err(UnknownModeError {
                kind: "rating mode",
                value: other.to_string(),
                expected: "average, any_high",
            }),
        }
    }
}

impl fmt::Display for RatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingMode::Average => write!(f, "average"),
            RatingMode::AnyHigh => write!(f, "any_high"),
        }
    }
}

/// How much of a series must have been watched before it is considered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeriesWatchMode {
    /// Every episode watched to the end
    Full,
    /// Any episode activity at all
    Bored,
}

impl SeriesWatchMode {
    pub fn is_satisfied_by(&self, watch_fraction: f64) -> bool {
        match self {
            SeriesWatchMode::Full => watch_fraction >= 1.0,
            SeriesWatchMode::Bored => watch_fraction > 0.0,
        }
    }
}

impl FromStr for SeriesWatchMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(SeriesWatchMode::Full),
            "bored" => Ok(SeriesWatchMode::Bored),
            other => Err(UnknownModeError {
                kind: "series watch mode",
                value: other.to_string(),
                expected: "full, bored",
            }),
        }
    }
}

impl fmt::Display for SeriesWatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesWatchMode::Full => write!(f, "full"),
            SeriesWatchMode::Bored => write!(f, "bored"),
        }
    }
}

/// Immutable retention policy for one run.
///
/// Built and validated by the config crate; everything downstream takes it by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub dry_run: bool,
    pub rating_threshold: f64,
    pub rating_mode: RatingMode,
    pub series_watch_mode: SeriesWatchMode,
    pub days_delay_warning: i64,
    pub days_delay_deletion: i64,
    /// When false, items go straight from unseen to deleted
    pub warn_before_delete: bool,
    /// Lowercased library names
    pub excluded_libraries: BTreeSet<String>,
}

impl Policy {
    pub fn is_library_excluded(&self, library_name: &str) -> bool {
        self.excluded_libraries
            .contains(&library_name.trim().to_lowercase())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            dry_run: true,
            rating_threshold: 6.5,
            rating_mode: RatingMode::Average,
            series_watch_mode: SeriesWatchMode::Full,
            days_delay_warning: 30,
            days_delay_deletion: 37,
            warn_before_delete: true,
            excluded_libraries: BTreeSet::new(),
        }
    }
}
