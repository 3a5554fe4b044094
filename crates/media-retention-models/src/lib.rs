pub mod media;
pub mod policy;
pub mod record;
pub mod summary;
pub mod watch_event;

pub use media::{ItemKind, MediaItem, Ratings};
pub use policy::{Policy, RatingMode, SeriesWatchMode, UnknownModeError};
pub use record::{phase_of, Phase, RetentionRecord};
pub use summary::{ActedItem, ItemError, RunSummary, SkipReason, SkippedItem};
pub use watch_event::{MediaType, WatchEvent};
