// Storage collaborator for emissions records. The service only talks to the
// `EmissionsStore` trait; the backends here are an in-process map and a JSON
// document on disk.
use shared::models::{DateRange, EmissionsRecord};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::{StorageKind, StorageSettings};
use crate::error::EngineError;

pub trait EmissionsStore: Send + Sync {
    /// Fails on a duplicate id; nothing is stored in that case.
    fn insert(&mut self, record: EmissionsRecord) -> Result<(), EngineError>;

    /// Inserts in order and stops at the first failure. Backends that can
    /// write a batch at once override this.
    fn insert_many(&mut self, records: Vec<EmissionsRecord>) -> Result<(), EngineError> {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Option<EmissionsRecord>;

    /// Records of one organization ordered by period start. With `period`,
    /// only records whose period lies entirely inside it are returned.
    fn records_for_organization(&self, organization_id: &str, period: Option<&DateRange>) -> Vec<EmissionsRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type SharedStore = Arc<RwLock<Box<dyn EmissionsStore>>>;

pub fn into_shared(store: Box<dyn EmissionsStore>) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// Builds the backend named by the settings.
pub fn open_store(settings: &StorageSettings) -> Result<Box<dyn EmissionsStore>, EngineError> {
    match settings.kind {
        StorageKind::Memory => Ok(Box::new(InMemoryStore::new())),
        StorageKind::JsonFile => {
            let path = settings.path.as_deref().ok_or_else(|| {
                EngineError::ConfigError("storage.path is required for json_file storage".to_string())
            })?;
            Ok(Box::new(JsonFileStore::open(path)?))
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    // organization id -> records sorted by period start
    data: HashMap<String, Vec<EmissionsRecord>>,
    index: HashMap<Uuid, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove(&mut self, id: &Uuid) -> Option<EmissionsRecord> {
        let organization_id = self.index.remove(id)?;
        let records = self.data.get_mut(&organization_id)?;
        let pos = records.iter().position(|r| &r.id == id)?;
        Some(records.remove(pos))
    }

    fn all_records(&self) -> Vec<&EmissionsRecord> {
        let mut organizations: Vec<&String> = self.data.keys().collect();
        organizations.sort();
        organizations
            .into_iter()
            .filter_map(|org| self.data.get(org))
            .flatten()
            .collect()
    }
}

impl EmissionsStore for InMemoryStore {
    fn insert(&mut self, record: EmissionsRecord) -> Result<(), EngineError> {
        if self.index.contains_key(&record.id) {
            return Err(EngineError::StorageError(format!(
                "Record {} already exists",
                record.id
            )));
        }
        self.index.insert(record.id, record.organization_id.clone());
        let records = self.data.entry(record.organization_id.clone()).or_default();
        let pos = records.partition_point(|r| {
            (r.period.start(), r.recorded_at) <= (record.period.start(), record.recorded_at)
        });
        records.insert(pos, record);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Option<EmissionsRecord> {
        let organization_id = self.index.get(id)?;
        self.data
            .get(organization_id)?
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    fn records_for_organization(&self, organization_id: &str, period: Option<&DateRange>) -> Vec<EmissionsRecord> {
        self.data
            .get(organization_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| period.map_or(true, |p| p.contains_range(&r.period)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Keeps every record in memory and rewrites the whole JSON document on each
/// write (temp file, then rename). `insert_many` writes the document once for
/// the whole batch and keeps none of it if that write fails.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl JsonFileStore {
    /// A missing file is an empty store; it is created on the first insert.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let mut inner = InMemoryStore::new();
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            if !raw.trim().is_empty() {
                let records: Vec<EmissionsRecord> = serde_json::from_str(&raw).map_err(|e| {
                    EngineError::StorageError(format!(
                        "Failed to read records from '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                for record in records {
                    inner.insert(record)?;
                }
            }
        }
        tracing::debug!(path = %path.display(), records = inner.len(), "Opened JSON emissions store");
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn persist(&self) -> Result<(), EngineError> {
        let body = serde_json::to_string_pretty(&self.inner.all_records())?;
        let tmp = self.path.with_extension("json.tmp");
        let written = fs::write(&tmp, body).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            if tmp.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temporary store file");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback(&mut self, ids: &[Uuid]) {
        for id in ids {
            self.inner.remove(id);
        }
    }
}

impl EmissionsStore for JsonFileStore {
    fn insert(&mut self, record: EmissionsRecord) -> Result<(), EngineError> {
        self.insert_many(vec![record])
    }

    fn insert_many(&mut self, records: Vec<EmissionsRecord>) -> Result<(), EngineError> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id;
            if let Err(e) = self.inner.insert(record) {
                self.rollback(&inserted);
                return Err(e);
            }
            inserted.push(id);
        }
        if let Err(e) = self.persist() {
            // Keep memory consistent with what is on disk.
            self.rollback(&inserted);
            tracing::error!(
                path = %self.path.display(),
                records = inserted.len(),
                error = %e,
                "Failed to persist emissions records"
            );
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Option<EmissionsRecord> {
        self.inner.get(id)
    }

    fn records_for_organization(&self, organization_id: &str, period: Option<&DateRange>) -> Vec<EmissionsRecord> {
        self.inner.records_for_organization(organization_id, period)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared::models::EmissionsScope;
    use tempfile::tempdir;

    fn record(org: &str, month: u32, value: f64) -> EmissionsRecord {
        let start = Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, month, 28, 0, 0, 0).unwrap();
        EmissionsRecord {
            id: Uuid::new_v4(),
            organization_id: org.to_string(),
            scope: EmissionsScope::Scope1,
            value,
            unit: "tCO2e".to_string(),
            period: DateRange::new(start, end).unwrap(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_in_memory_insert_and_get() {
        let mut store = InMemoryStore::new();
        let r = record("org-a", 1, 10.0);
        store.insert(r.clone()).unwrap();
        assert_eq!(store.get(&r.id), Some(r));
        assert_eq!(store.len(), 1);
        assert!(store.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_in_memory_rejects_duplicate_id() {
        let mut store = InMemoryStore::new();
        let r = record("org-a", 1, 10.0);
        store.insert(r.clone()).unwrap();
        let err = store.insert(r).unwrap_err();
        assert!(matches!(err, EngineError::StorageError(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_records_sorted_and_filtered_by_period() {
        let mut store = InMemoryStore::new();
        store.insert(record("org-a", 3, 3.0)).unwrap();
        store.insert(record("org-a", 1, 1.0)).unwrap();
        store.insert(record("org-a", 2, 2.0)).unwrap();
        store.insert(record("org-b", 1, 99.0)).unwrap();

        let all = store.records_for_organization("org-a", None);
        let values: Vec<f64> = all.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let q1 = DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let values: Vec<f64> = store
            .records_for_organization("org-a", Some(&q1))
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0]);
        assert!(store.records_for_organization("org-c", None).is_empty());
    }

    #[test]
    fn test_json_file_store_reopens_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emissions.json");
        let r = record("org-a", 5, 12.5);
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            assert!(store.is_empty());
            store.insert(r.clone()).unwrap();
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&r.id), Some(r));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_file_store_rolls_back_on_write_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("emissions.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        let r = record("org-a", 1, 1.0);
        let err = store.insert(r.clone()).unwrap_err();
        assert!(matches!(err, EngineError::IoError { .. }));
        assert!(store.get(&r.id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_file_store_removes_temp_file_when_rename_fails() {
        let dir = tempdir().unwrap();
        // A non-empty directory where the document should be makes the rename fail.
        let path = dir.path().join("emissions.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();
        let mut store = JsonFileStore {
            path: path.clone(),
            inner: InMemoryStore::new(),
        };

        assert!(store.insert(record("org-a", 1, 1.0)).is_err());
        assert!(store.is_empty());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_file_store_insert_many_writes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emissions.json");
        let batch = vec![record("org-a", 1, 1.0), record("org-a", 2, 2.0), record("org-b", 1, 3.0)];
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.insert_many(batch.clone()).unwrap();
            assert_eq!(store.len(), 3);
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        for r in &batch {
            assert_eq!(reopened.get(&r.id).as_ref(), Some(r));
        }
    }

    #[test]
    fn test_json_file_store_insert_many_rolls_back_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emissions.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        let existing = record("org-a", 1, 1.0);
        store.insert(existing.clone()).unwrap();

        // The duplicate in the middle fails the whole batch.
        let fresh = record("org-a", 2, 2.0);
        let err = store
            .insert_many(vec![fresh.clone(), existing.clone(), record("org-a", 3, 3.0)])
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageError(_)));
        assert_eq!(store.len(), 1);
        assert!(store.get(&fresh.id).is_none());
        assert_eq!(JsonFileStore::open(&path).unwrap().len(), 1);

        let missing = dir.path().join("missing-dir").join("emissions.json");
        let mut unwritable = JsonFileStore::open(&missing).unwrap();
        assert!(unwritable
            .insert_many(vec![record("org-a", 1, 1.0), record("org-a", 2, 2.0)])
            .is_err());
        assert!(unwritable.is_empty());
    }

    #[test]
    fn test_json_file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emissions.json");
        fs::write(&path, "{ not a list").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(EngineError::StorageError(_))
        ));
    }

    #[test]
    fn test_open_store_from_settings() {
        let memory = open_store(&StorageSettings {
            kind: StorageKind::Memory,
            path: None,
        })
        .unwrap();
        assert!(memory.is_empty());

        let missing_path = open_store(&StorageSettings {
            kind: StorageKind::JsonFile,
            path: None,
        });
        assert!(matches!(missing_path, Err(EngineError::ConfigError(_))));
    }
}
