use crate::scheduler::RetentionScheduler;
use chrono::{DateTime, Utc};
use media_retention_models::RunSummary;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// What happened to one trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Completed(RunSummary),
    /// A run was already in progress; this trigger was dropped
    Skipped,
    /// The run aborted before finishing (history or state unavailable)
    Failed(String),
}

/// Serializes evaluation passes: Idle -> Running -> Idle.
///
/// Cheap to clone; clones share the same scheduler.
#[derive(Clone)]
pub struct RunDriver {
    scheduler: Arc<Mutex<RetentionScheduler>>,
}

impl RunDriver {
    pub fn new(scheduler: RetentionScheduler) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.try_lock().is_err()
    }

    pub async fn trigger(&self) -> TriggerOutcome {
        self.trigger_at(Utc::now()).await
    }

    /// Run one pass unless another is in progress. Overlapping triggers are
    /// dropped, never queued.
    pub async fn trigger_at(&self, now: DateTime<Utc>) -> TriggerOutcome {
        let mut scheduler = match self.scheduler.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(
                    operation = "retention_run_skipped",
                    "Previous retention run still in progress, skipping this trigger"
                );
                return TriggerOutcome::Skipped;
            }
        };

        let start = Instant::now();
        info!(operation = "retention_run_start", "Starting retention run");
        match scheduler.run_once(now).await {
            Ok(summary) => {
                info!(
                    operation = "retention_run_complete",
                    warned = summary.warned.len(),
                    deleted = summary.deleted.len(),
                    errors = summary.errors.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Retention run completed"
                );
                TriggerOutcome::Completed(summary)
            }
            Err(e) => {
                error!(
                    operation = "retention_run_error",
                    error = %e,
                    "Retention run failed; will retry at the next trigger"
                );
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use media_retention_models::{MediaItem, Policy, Ratings, WatchEvent};
    use media_retention_sources::{
        Adapters, DeleteOutcome, DeletionSink, HistorySource, Notification, NotificationSink,
        RatingSource, SourceError,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// History source that blocks until released, to hold a run open.
    #[derive(Default)]
    struct GatedHistory {
        entered: Notify,
        release: Notify,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl HistorySource for GatedHistory {
        fn source_name(&self) -> &str {
            "gated"
        }

        async fn fetch_watch_history(&self) -> Result<Vec<WatchEvent>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SourceError::fetch("tautulli unreachable"));
            }
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    struct Nothing;

    #[async_trait]
    impl RatingSource for Nothing {
        fn source_name(&self) -> &str {
            "nothing"
        }

        async fn fetch_ratings(&self, _item: &MediaItem) -> Result<Ratings, SourceError> {
            Ok(Ratings::new())
        }
    }

    #[async_trait]
    impl DeletionSink for Nothing {
        fn sink_name(&self) -> &str {
            "nothing"
        }

        async fn delete(&self, _item: &MediaItem) -> Result<DeleteOutcome, SourceError> {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }

    #[async_trait]
    impl NotificationSink for Nothing {
        fn sink_name(&self) -> &str {
            "nothing"
        }

        async fn notify(&self, _notification: &Notification) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn driver(history: Arc<GatedHistory>) -> RunDriver {
        let adapters = Adapters {
            history,
            ratings: Arc::new(Nothing),
            deleter: Arc::new(Nothing),
            notifier: Arc::new(Nothing),
        };
        RunDriver::new(RetentionScheduler::new(
            Policy::default(),
            adapters,
            Box::new(MemoryStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let history = Arc::new(GatedHistory::default());
        let driver = driver(history.clone());

        let first = tokio::spawn({
            let driver = driver.clone();
            async move { driver.trigger().await }
        });
        history.entered.notified().await;
        assert!(driver.is_running());

        assert_eq!(driver.trigger().await, TriggerOutcome::Skipped);

        history.release.notify_one();
        let outcome = tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert!(!driver.is_running());
        assert_eq!(history.calls.load(Ordering::SeqCst), 1);

        // Idle again: the next trigger runs
        history.release.notify_one();
        assert!(matches!(driver.trigger().await, TriggerOutcome::Completed(_)));
        assert_eq!(history.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_run_is_reported_and_driver_recovers() {
        let history = Arc::new(GatedHistory::default());
        history.fail.store(true, Ordering::SeqCst);
        let driver = driver(history.clone());

        match driver.trigger().await {
            TriggerOutcome::Failed(message) => assert!(message.contains("tautulli unreachable")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!driver.is_running());

        history.fail.store(false, Ordering::SeqCst);
        history.release.notify_one();
        assert!(matches!(driver.trigger().await, TriggerOutcome::Completed(_)));
    }
}
