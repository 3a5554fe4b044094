pub mod config;
pub mod credentials;
pub mod error;
pub mod paths;
pub mod schedule;

pub use config::{parse_library_list, ArrConfig, Config, LoggingConfig, NotificationConfig, PlexConfig, PolicyConfig, SchedulerConfig, TautulliConfig};
pub use credentials::{CredentialStore, ServiceCredentials};
pub use error::ConfigError;
pub use paths::{container_base_path, PathManager};
pub use schedule::{parse_timezone, ResolvedSchedule, ScheduleTime};
