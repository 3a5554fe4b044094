pub mod arr;
pub mod error;
pub mod factory;
pub mod guid;
pub mod notify;
pub mod plex;
pub mod tautulli;
pub mod traits;

pub use error::SourceError;
pub use factory::Adapters;
pub use guid::ExternalIds;
pub use traits::{
    DeleteOutcome, DeletionSink, HistorySource, Notification, NotificationKind, NotificationSink,
    RatingSource,
};
