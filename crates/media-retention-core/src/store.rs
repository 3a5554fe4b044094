use media_retention_config::PathManager;
use media_retention_models::RetentionRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access retention state at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Never reset silently: an empty store would re-warn every item.
    #[error("retention state at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize retention state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable item_id -> record mapping. Only the active run writes to it.
pub trait RecordStore: Send + Sync {
    /// Every record, read once at run start.
    fn load_all(&self) -> Result<BTreeMap<String, RetentionRecord>, StoreError>;

    fn get(&self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError>;

    /// Insert or replace, durable before returning.
    fn put(&mut self, record: RetentionRecord) -> Result<(), StoreError>;

    /// Drop a record, returning the item to `Unseen`.
    fn remove(&mut self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, RetentionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = RetentionRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.item_id.clone(), r)).collect(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&self) -> Result<BTreeMap<String, RetentionRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn get(&self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError> {
        Ok(self.records.get(item_id).cloned())
    }

    fn put(&mut self, record: RetentionRecord) -> Result<(), StoreError> {
        self.records.insert(record.item_id.clone(), record);
        Ok(())
    }

    fn remove(&mut self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError> {
        Ok(self.records.remove(item_id))
    }
}

/// JSON file store, rewritten atomically on every change.
///
/// Every read goes back to disk and every write applies to what is on disk at
/// that moment, so edits from another handle (`state forget`) survive. Each transition is flushed before the next item is processed, so a run
/// killed halfway leaves every completed transition on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: BTreeMap<String, RetentionRecord>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            debug!("No retention state at {}, starting empty", path.display());
        }
        let records = read_records(&path)?;
        info!("Loaded {} retention records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    pub fn open_default(paths: &PathManager) -> Result<Self, StoreError> {
        Self::open(paths.state_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pick up changes written by other handles since the last operation.
    fn refresh(&mut self) -> Result<(), StoreError> {
        self.records = read_records(&self.path)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.records)?;
        // Atomic write: temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// Missing or blank file is an empty store; anything unparsable is an error.
fn read_records(path: &Path) -> Result<BTreeMap<String, RetentionRecord>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

impl RecordStore for JsonFileStore {
    fn load_all(&self) -> Result<BTreeMap<String, RetentionRecord>, StoreError> {
        read_records(&self.path)
    }

    fn get(&self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError> {
        Ok(read_records(&self.path)?.remove(item_id))
    }

    fn put(&mut self, record: RetentionRecord) -> Result<(), StoreError> {
        self.refresh()?;
        let previous = self.records.insert(record.item_id.clone(), record.clone());
        if let Err(e) = self.flush() {
            // Keep memory in step with disk
            match previous {
                Some(previous) => self.records.insert(record.item_id.clone(), previous),
                None => self.records.remove(&record.item_id),
            };
            return Err(e);
        }
        debug!("Stored {} as {}", record.item_id, record.phase);
        Ok(())
    }

    fn remove(&mut self, item_id: &str) -> Result<Option<RetentionRecord>, StoreError> {
        self.refresh()?;
        let removed = self.records.remove(item_id);
        if let Some(record) = &removed {
            if let Err(e) = self.flush() {
                self.records.insert(item_id.to_string(), record.clone());
                return Err(e);
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use media_retention_models::Phase;
    use tempfile::TempDir;

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("retention_state.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.load_all().unwrap().is_empty());
        store
            .put(RetentionRecord::warned("1", Some("The Room".to_string()), Utc::now()))
            .unwrap();
        store.put(RetentionRecord::deleted("2", None, Utc::now())).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let mut reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("1").unwrap().unwrap().phase, Phase::Warned);
        assert_eq!(reopened.get("2").unwrap().unwrap().phase, Phase::Deleted);

        assert!(reopened.remove("1").unwrap().is_some());
        assert!(reopened.remove("1").unwrap().is_none());
        let again = JsonFileStore::open(&path).unwrap();
        assert_eq!(again.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("retention_state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Corrupt { .. })));

        std::fs::write(&path, "").unwrap();
        assert!(JsonFileStore::open(&path).unwrap().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_second_handle_edits_are_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("retention_state.json");

        let mut daemon = JsonFileStore::open(&path).unwrap();
        daemon.put(RetentionRecord::warned("1", None, Utc::now())).unwrap();

        let mut cli = JsonFileStore::open(&path).unwrap();
        assert!(cli.remove("1").unwrap().is_some());

        assert!(daemon.load_all().unwrap().is_empty());
        assert!(daemon.get("1").unwrap().is_none());

        daemon.put(RetentionRecord::deleted("2", None, Utc::now())).unwrap();
        let on_disk = JsonFileStore::open(&path).unwrap().load_all().unwrap();
        assert!(!on_disk.contains_key("1"));
        assert_eq!(on_disk["2"].phase, Phase::Deleted);
    }

    #[test]
    fn test_failed_flush_rolls_back_memory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("retention_state.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.put(RetentionRecord::warned("1", None, Utc::now())).unwrap();

        // A directory where the temp file should go makes every write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        let err = store.put(RetentionRecord::warned("2", None, Utc::now())).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.records.contains_key("2"));

        assert!(store.remove("1").is_err());
        assert_eq!(store.records["1"].phase, Phase::Warned);

        let on_disk = store.load_all().unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk["1"].phase, Phase::Warned);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::with_records([RetentionRecord::warned("1", None, Utc::now())]);
        assert_eq!(store.get("1").unwrap().unwrap().phase, Phase::Warned);
        store.put(RetentionRecord::deleted("1", None, Utc::now())).unwrap();
        assert_eq!(store.load_all().unwrap()["1"].phase, Phase::Deleted);
    }
}
