use crate::policy::{evaluate, watch_gate_met};
use crate::store::{RecordStore, StoreError};
use crate::tracker::{track, Candidacy, TrackedItem};
use chrono::{DateTime, Utc};
use media_retention_models::{
    ActedItem, ItemError, ItemKind, MediaItem, Phase, Policy, RetentionRecord, RunSummary, SkipReason,
    SkippedItem,
};
use media_retention_sources::{
    Adapters, DeleteOutcome, Notification, NotificationKind, SourceError,
};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};


/// Failure that aborts a whole run. Per-item failures land in `RunSummary::errors`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to fetch watch history: {0}")]
    History(#[source] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One evaluation pass over the watch history.
///
/// Owns the record store for the duration of a run; the run driver makes sure
/// only one pass is active at a time.
pub struct RetentionScheduler {
    policy: Policy,
    adapters: Adapters,
    store: Box<dyn RecordStore>,
}

impl RetentionScheduler {
    pub fn new(policy: Policy, adapters: Adapters, store: Box<dyn RecordStore>) -> Self {
        Self {
            policy,
            adapters,
            store,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Pull history, warn about and delete what the policy says, and report.
    ///
    /// In dry-run mode every decision is made and logged exactly as in live mode,
    /// but no notification or deletion is sent and no record is written.
    #[instrument(skip(self), fields(dry_run = self.policy.dry_run))]
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::new(self.policy.dry_run, now);
        info!(
            "Starting retention run ({})",
            if self.policy.dry_run { "dry run" } else { "live" }
        );
        if !self.policy.excluded_libraries.is_empty() {
            let excluded: Vec<&str> = self.policy.excluded_libraries.iter().map(String::as_str).collect();
            info!("Excluding libraries: {}", excluded.join(", "));
        }

        let events = self
            .adapters
            .history
            .fetch_watch_history()
            .await
            .map_err(RunError::History)?;
        let records = self.store.load_all()?;
        let tracked = track(&events, &records);
        summary.items_examined = tracked.len();

        for mut entry in tracked {
            match entry.candidacy(&self.policy, now) {
                Candidacy::Warning => self.process_warning(&mut entry, now, &mut summary).await?,
                Candidacy::Deletion => self.process_deletion(&mut entry, now, &mut summary).await?,
                Candidacy::Excluded => {
                    debug!("'{}' is in excluded library '{}'", entry.item.title, entry.item.library_name)
                }
                Candidacy::Tombstoned => trace!("'{}' was already deleted", entry.item.title),
                Candidacy::NotDue { days_since_watch } => {
                    trace!("'{}' last watched {} days ago, not due", entry.item.title, days_since_watch)
                }
            }
        }

        summary.finished_at = Some(Utc::now());
        info!(
            examined = summary.items_examined,
            warned = summary.warned.len(),
            movies_deleted = summary.deleted_count(ItemKind::Movie),
            series_deleted = summary.deleted_count(ItemKind::Series),
            skipped = summary.skipped.len(),
            errors = summary.errors.len(),
            "Retention run finished"
        );
        Ok(summary)
    }

    /// Episode total and fresh ratings for a candidate.
    ///
    /// Ratings are only looked up once the watch gate is met.
    async fn refresh(&self, entry: &mut TrackedItem) -> Result<(), SourceError> {
        if entry.item.kind == ItemKind::Series {
            if let Some(total) = self
                .adapters
                .history
                .fetch_episode_count(&entry.item.item_id)
                .await?
            {
                entry.set_episode_total(total);
                if let Some(watched) = entry.watched_episodes() {
                    debug!("'{}': {}/{} episode(s) watched", entry.item.title, watched, total);
                }
            }
        }

        if watch_gate_met(entry.item.kind, entry.item.watch_fraction, &self.policy) {
            let fresh = self.adapters.ratings.fetch_ratings(&entry.item).await?;
            debug!("'{}': {} rating(s) from {}", entry.item.title, fresh.len(), self.adapters.ratings.source_name());
            entry.item.ratings.merge(&fresh);
        }
        Ok(())
    }

    async fn process_warning(
        &mut self,
        entry: &mut TrackedItem,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        if let Err(e) = self.refresh(entry).await {
            record_error(summary, &entry.item, &e);
            return Ok(());
        }

        let item = &entry.item;
        let result = evaluate(&item.ratings, item.watch_fraction, item.kind, &self.policy);
        let score = match result.decision() {
            Ok(score) => score,
            Err(reason) => {
                record_skip(summary, item, reason);
                return Ok(());
            }
        };

        if self.policy.dry_run {
            info!("[dry run] Would warn about '{}' (score {:.2})", item.title, score);
            summary.warned.push(acted(item));
            return Ok(());
        }

        let notification = Notification {
            kind: NotificationKind::Warning,
            item_id: item.item_id.clone(),
            title: item.title.clone(),
            message: warning_message(item, score, &self.policy, now),
            recipients: recipients(item),
        };
        if let Err(e) = self.adapters.notifier.notify(&notification).await {
            // Phase stays Unseen so the warning is retried next run
            record_error(summary, item, &e);
            return Ok(());
        }

        self.store
            .put(RetentionRecord::warned(&item.item_id, Some(item.title.clone()), now))?;
        info!("Warned about '{}' (score {:.2})", item.title, score);
        summary.warned.push(acted(item));
        Ok(())
    }

    async fn process_deletion(
        &mut self,
        entry: &mut TrackedItem,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        if let Err(e) = self.refresh(entry).await {
            record_error(summary, &entry.item, &e);
            return Ok(());
        }

        let result = evaluate(&entry.item.ratings, entry.item.watch_fraction, entry.item.kind, &self.policy);
        let score = match result.decision() {
            Ok(score) => score,
            Err(SkipReason::RatingAboveThreshold { score, threshold }) if entry.phase == Phase::Warned => {
                self.rescue(&entry.item, score, threshold)?;
                record_skip(summary, &entry.item, SkipReason::Rescued { score, threshold });
                return Ok(());
            }
            Err(reason) => {
                // Missing ratings or watch progress can be transient; a warned item stays warned
                record_skip(summary, &entry.item, reason);
                return Ok(());
            }
        };

        if !self.adapters.deleter.handles(entry.item.kind) {
            // Stays warned until a manager for this kind is configured
            let err = SourceError::NotConfigured(format!("{} deletion via {}", entry.item.kind, self.adapters.deleter.sink_name()));
            record_error(summary, &entry.item, &err);
            return Ok(());
        }

        if self.policy.dry_run {
            info!("[dry run] Would delete '{}' (score {:.2})", entry.item.title, score);
            summary.deleted.push(acted(&entry.item));
            return Ok(());
        }

        match self.adapters.history.fetch_external_guids(&entry.item.item_id).await {
            Ok(guids) => {
                for guid in &guids {
                    entry.item.add_guid(guid);
                }
            }
            Err(e) => {
                record_error(summary, &entry.item, &e);
                return Ok(());
            }
        }

        let item = &entry.item;
        let outcome = match self.adapters.deleter.delete(item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                record_error(summary, item, &e);
                return Ok(());
            }
        };
        if outcome == DeleteOutcome::AlreadyAbsent {
            info!("'{}' was already gone from {}", item.title, self.adapters.deleter.sink_name());
        }

        self.store
            .put(RetentionRecord::deleted(&item.item_id, Some(item.title.clone()), now))?;
        info!("Deleted '{}' (score {:.2})", item.title, score);
        summary.deleted.push(acted(item));

        let report = Notification {
            kind: NotificationKind::Deletion,
            item_id: item.item_id.clone(),
            title: item.title.clone(),
            message: deletion_message(item, score, &self.policy),
            recipients: recipients(item),
        };
        if let Err(e) = self.adapters.notifier.notify(&report).await {
            // Deletion already happened; only the report is lost
            summary.errors.push(ItemError {
                item_id: item.item_id.clone(),
                title: item.title.clone(),
                error: format!("deletion report not sent: {}", e),
            });
            warn!("Deletion report for '{}' not sent: {}", item.title, e);
        }
        Ok(())
    }

    /// A warned item re-rated at or above the threshold goes back to `Unseen`.
    fn rescue(&mut self, item: &MediaItem, score: f64, threshold: f64) -> Result<(), StoreError> {
        if self.policy.dry_run {
            info!("[dry run] Would clear the warning for '{}' (now rated {:.2} >= {})", item.title, score, threshold);
        } else {
            self.store.remove(&item.item_id)?;
            info!("Cleared the warning for '{}' (now rated {:.2} >= {})", item.title, score, threshold);
        }
        Ok(())
    }
}

fn acted(item: &MediaItem) -> ActedItem {
    ActedItem {
        item_id: item.item_id.clone(),
        title: item.title.clone(),
        kind: item.kind,
    }
}

fn record_skip(summary: &mut RunSummary, item: &MediaItem, reason: SkipReason) {
    info!("Keeping '{}': {}", item.title, reason);
    summary.skipped.push(SkippedItem {
        item_id: item.item_id.clone(),
        title: item.title.clone(),
        reason,
    });
}

fn record_error(summary: &mut RunSummary, item: &MediaItem, err: &SourceError) {
    error!("'{}' ({}): {}", item.title, item.item_id, err);
    summary.errors.push(ItemError {
        item_id: item.item_id.clone(),
        title: item.title.clone(),
        error: err.to_string(),
    });
}

/// Everyone who watched or rated the item.
fn recipients(item: &MediaItem) -> Vec<String> {
    let mut users: BTreeSet<&str> = item.watchers.iter().map(String::as_str).collect();
    users.extend(item.ratings.users());
    users.into_iter().map(str::to_string).collect()
}

fn warning_message(item: &MediaItem, score: f64, policy: &Policy, now: DateTime<Utc>) -> String {
    let days_left = (policy.days_delay_deletion - item.days_since_watch(now)).max(1);
    format!(
        "'{}' ({}) is rated {:.1}, below the {} threshold, and was last watched {} days ago. \
         It will be deleted in {} days unless someone rates it {} or higher or watches it again.",
        item.title,
        item.kind,
        score,
        policy.rating_threshold,
        item.days_since_watch(now),
        days_left,
        policy.rating_threshold
    )
}

fn deletion_message(item: &MediaItem, score: f64, policy: &Policy) -> String {
    format!(
        "'{}' ({}) has been deleted: rated {:.1}, below the {} threshold.",
        item.title, item.kind, score, policy.rating_threshold
    )
}
