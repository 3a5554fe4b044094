use crate::output::Output;
use crate::StateCommands;
use color_eyre::Result;
use media_retention_config::PathManager;
use media_retention_core::{JsonFileStore, RecordStore};
use media_retention_models::{Phase, RetentionRecord};

pub fn run_state(cmd: StateCommands, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let mut store = JsonFileStore::open_default(&path_manager)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to open retention state: {}", e))?;

    match cmd {
        StateCommands::Show => {
            let records = sorted_records(&store)?;
            output.records(&records);
            if output.is_human() && !records.is_empty() {
                let warned = records.iter().filter(|r| r.phase == Phase::Warned).count();
                output.info(format!(
                    "{} warned, {} deleted ({})",
                    warned,
                    records.len() - warned,
                    store.path().display()
                ));
            }
            Ok(())
        }
        StateCommands::Forget { item_id } => {
            let removed = store
                .remove(&item_id)
                .map_err(|e| color_eyre::eyre::eyre!("Failed to update retention state: {}", e))?;
            match removed {
                Some(record) => output.success(format!(
                    "Forgot {} ({}, was {}); it will be evaluated from scratch on the next run",
                    record.title.as_deref().unwrap_or(&record.item_id),
                    record.item_id,
                    record.phase
                )),
                None => output.warn(format!("No record for item {}", item_id)),
            }
            Ok(())
        }
    }
}

/// Warned items first (they are the ones still pending), newest transition first.
fn sorted_records(store: &dyn RecordStore) -> Result<Vec<RetentionRecord>> {
    let mut records: Vec<RetentionRecord> = store
        .load_all()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read retention state: {}", e))?
        .into_values()
        .collect();
    records.sort_by(|a, b| {
        a.phase
            .cmp(&b.phase)
            .then_with(|| b.phase_entered_at.cmp(&a.phase_entered_at))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use media_retention_core::MemoryStore;

    #[test]
    fn test_records_sorted_warned_first_then_newest() {
        let now = Utc::now();
        let store = MemoryStore::with_records([
            RetentionRecord::deleted("1", None, now - Duration::days(3)),
            RetentionRecord::warned("2", None, now - Duration::days(5)),
            RetentionRecord::warned("3", None, now - Duration::days(1)),
            RetentionRecord::deleted("4", None, now),
        ]);

        let ids: Vec<String> = sorted_records(&store)
            .unwrap()
            .into_iter()
            .map(|r| r.item_id)
            .collect();
        assert_eq!(ids, vec!["3", "2", "4", "1"]);
    }
}
