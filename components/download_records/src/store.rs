use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::record::{DownloadRecord, RecordId};

pub const RECORDS_FILE_NAME: &str = "downloads.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    next_id: RecordId,
    records: Vec<DownloadRecord>,
}

/// Download records behind a lock, mirrored to a JSON file after every change
///
/// An in-memory store (see [`RecordStore::in_memory`]) never touches disk.
#[derive(Debug)]
pub struct RecordStore {
    path: Option<PathBuf>,
    state: Mutex<RecordFile>,
}

impl RecordStore {
    /// Load `<data_dir>/downloads.json`, or start empty if it doesn't exist yet
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| StoreError::io("create", data_dir, e))?;
        let path = data_dir.join(RECORDS_FILE_NAME);

        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordFile::default(),
            Err(e) => return Err(StoreError::io("read", path, e)),
        };
        info!(
            "Opened download records at {} ({} records)",
            path.display(),
            state.records.len()
        );

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(RecordFile::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store a new pending record for `url` and return it
    ///
    /// Rewrites the records file under the lock, so async callers run this
    /// on a blocking thread.
    pub fn create(
        &self,
        url: impl Into<String>,
        format_id: Option<String>,
    ) -> Result<DownloadRecord, StoreError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let record = DownloadRecord::new(state.next_id, url, format_id);
        state.records.push(record.clone());
        self.persist(&state)?;
        debug!("Created download record {}", record.id);
        Ok(record)
    }

    /// Apply `change` to one record, persist, and return the updated copy
    pub fn update<F>(&self, id: RecordId, change: F) -> Result<DownloadRecord, StoreError>
    where
        F: FnOnce(&mut DownloadRecord),
    {
        let mut state = self.state.lock();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        change(record);
        let updated = record.clone();
        self.persist(&state)?;
        Ok(updated)
    }

    pub fn get(&self, id: RecordId) -> Option<DownloadRecord> {
        self.state.lock().records.iter().find(|r| r.id == id).cloned()
    }

    /// All records, newest first
    pub fn list(&self) -> Vec<DownloadRecord> {
        let state = self.state.lock();
        state.records.iter().rev().cloned().collect()
    }

    fn persist(&self, state: &RecordFile) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| StoreError::io("write", &tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::io("replace", path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DownloadStatus;
    use assert_matches::assert_matches;
    use storage_primitives::ByteSize;
    use tempfile::TempDir;

    #[test]
    fn ids_increase_and_list_is_newest_first() {
        let store = RecordStore::in_memory();
        let first = store.create("https://a.example/1", None).unwrap();
        let second = store
            .create("https://a.example/2", Some("22".into()))
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let ids: Vec<_> = store.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn update_changes_one_record() {
        let store = RecordStore::in_memory();
        let record = store.create("https://a.example/1", None).unwrap();

        let updated = store
            .update(record.id, |r| {
                r.status = DownloadStatus::Downloading;
                r.set_progress(42.0);
            })
            .unwrap();

        assert_eq!(updated.status, DownloadStatus::Downloading);
        assert_eq!(store.get(record.id).unwrap().progress, 42.0);
    }

    #[test]
    fn update_of_unknown_id_fails() {
        let store = RecordStore::in_memory();
        assert_matches!(store.update(99, |_| {}), Err(StoreError::NotFound(99)));
        assert!(store.get(99).is_none());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RecordStore::open(dir.path()).unwrap();
            let record = store.create("https://a.example/1", None).unwrap();
            store
                .update(record.id, |r| {
                    r.filename = Some("Clip.mp4".into());
                    r.file_size = Some(ByteSize::new(2048));
                    r.status = DownloadStatus::Completed;
                })
                .unwrap();
        }

        let reopened = RecordStore::open(dir.path()).unwrap();
        let records = reopened.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename.as_deref(), Some("Clip.mp4"));
        assert_eq!(records[0].status, DownloadStatus::Completed);
        assert_eq!(records[0].file_size_label(), "2.0 KB");

        // ids keep counting after a reopen
        let next = reopened.create("https://a.example/2", None).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn open_creates_missing_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state").join("records");
        let store = RecordStore::open(&nested).unwrap();
        store.create("https://a.example/1", None).unwrap();
        assert!(nested.join(RECORDS_FILE_NAME).exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(RECORDS_FILE_NAME), b"{not json").unwrap();
        assert_matches!(RecordStore::open(dir.path()), Err(StoreError::Corrupt(_)));
    }
}
