pub mod driver;
pub mod policy;
pub mod scheduler;
pub mod store;
pub mod tracker;

pub use driver::{RunDriver, TriggerOutcome};
pub use policy::{evaluate, EligibilityReason, EligibilityResult};
pub use scheduler::{RetentionScheduler, RunError};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
pub use tracker::{track, Candidacy, TrackedItem};
