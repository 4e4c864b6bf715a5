//! Directory of pretty-printed JSON snapshot files

use super::traits::{OpenStore, SnapshotInfo, SnapshotStore, StorageError, StorageResult};
use crate::graph::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

const PREFIX: &str = "snapshot-";
const EXTENSION: &str = "json";

/// One file per snapshot, named `snapshot-<save sequence>-<export time>.json`.
///
/// The zero-padded save sequence orders the files, so "latest" is the most
/// recently saved snapshot whatever its export time. The same format is
/// written by the export feature and read by `inspect`.
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes name allocation between concurrent saves
    write_lock: Mutex<()>,
    /// Keeps the backing directory alive for in-memory stores
    _temp: Option<TempDir>,
}

impl JsonFileStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }

    fn is_valid_id(id: &str) -> bool {
        id.starts_with(PREFIX) && !id.contains(['/', '\\']) && !id.contains("..")
    }

    /// Save sequence encoded in an id, `None` for foreign names
    fn sequence(id: &str) -> Option<u64> {
        id.strip_prefix(PREFIX)?.split('-').next()?.parse().ok()
    }

    /// Stored ids in save order
    fn ids(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Some(seq) = Self::sequence(stem) {
                    ids.push((seq, stem.to_string()));
                }
            }
        }
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    fn read(&self, id: &str) -> StorageResult<Snapshot> {
        let text = fs::read_to_string(self.path_for(id))?;
        Ok(Snapshot::from_json(&text)?)
    }
}

impl OpenStore for JsonFileStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            _temp: None,
        })
    }

    /// Backed by a temporary directory removed on drop
    fn open_in_memory() -> StorageResult<Self> {
        let temp = tempfile::tempdir()?;
        Ok(Self {
            dir: temp.path().to_path_buf(),
            write_lock: Mutex::new(()),
            _temp: Some(temp),
        })
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &Snapshot) -> StorageResult<String> {
        let body = snapshot.to_json_pretty()?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let exported = snapshot.exported_at.format("%Y%m%dT%H%M%S%.3fZ");
        let mut seq = match self.ids()?.last() {
            Some(last) => Self::sequence(last).map_or(0, |n| n.saturating_add(1)),
            None => 0,
        };
        let mut id = format!("{}{:020}-{}", PREFIX, seq, exported);
        while self.path_for(&id).exists() {
            seq = seq.saturating_add(1);
            id = format!("{}{:020}-{}", PREFIX, seq, exported);
        }

        fs::write(self.path_for(&id), body)?;
        Ok(id)
    }

    fn load(&self, id: &str) -> StorageResult<Option<Snapshot>> {
        if !Self::is_valid_id(id) || !self.path_for(id).exists() {
            return Ok(None);
        }
        self.read(id).map(Some)
    }

    fn load_latest(&self) -> StorageResult<Option<Snapshot>> {
        match self.ids()?.last() {
            Some(id) => self.read(id).map(Some),
            None => Ok(None),
        }
    }

    fn list(&self) -> StorageResult<Vec<SnapshotInfo>> {
        self.ids()?
            .into_iter()
            .map(|id| {
                let snapshot = self.read(&id)?;
                Ok::<_, StorageError>(SnapshotInfo {
                    id,
                    exported_at: snapshot.exported_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptGraph, ConceptOptions};

    fn snapshot_with(label: &str) -> Snapshot {
        let mut graph = ConceptGraph::new();
        graph.upsert_concept_at(label, ConceptOptions::default(), 0);
        graph.snapshot()
    }

    #[test]
    fn save_writes_pretty_json_file() {
        let store = JsonFileStore::open_in_memory().unwrap();
        let id = store.save(&snapshot_with("pricing")).unwrap();

        let text = fs::read_to_string(store.dir().join(format!("{}.json", id))).unwrap();
        assert!(text.contains("\n  \"exportedAt\""));
        assert!(text.contains("\"canonical_label\": \"pricing\""));
    }

    #[test]
    fn same_timestamp_gets_distinct_names() {
        let store = JsonFileStore::open_in_memory().unwrap();
        let snapshot = snapshot_with("pricing");

        let a = store.save(&snapshot).unwrap();
        let b = store.save(&snapshot).unwrap();

        assert_ne!(a, b);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    fn exported_at(rfc3339: &str) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn latest_is_last_saved() {
        let store = JsonFileStore::open_in_memory().unwrap();
        let mut older = snapshot_with("older");
        older.exported_at = exported_at("2024-01-01T00:00:00Z");
        store.save(&older).unwrap();
        store.save(&snapshot_with("newer")).unwrap();

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.nodes[0].id.as_str(), "newer");
    }

    #[test]
    fn latest_ignores_export_time() {
        let store = JsonFileStore::open_in_memory().unwrap();
        let mut newer = snapshot_with("newer");
        newer.exported_at = exported_at("2025-06-01T00:00:00Z");
        let mut older = snapshot_with("older");
        older.exported_at = exported_at("2024-01-01T00:00:00Z");

        store.save(&newer).unwrap();
        store.save(&older).unwrap();

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.nodes[0].id.as_str(), "older");
        let listed: Vec<_> = store.list().unwrap().into_iter().map(|info| info.exported_at).collect();
        assert_eq!(listed, vec![newer.exported_at, older.exported_at]);
    }

    #[test]
    fn many_saves_with_one_timestamp_stay_ordered() {
        let store = JsonFileStore::open_in_memory().unwrap();
        let stamp = exported_at("2025-06-01T00:00:00Z");
        for n in 0..12 {
            let mut snapshot = snapshot_with(&format!("n{}", n));
            snapshot.exported_at = stamp;
            store.save(&snapshot).unwrap();
        }

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.nodes[0].id.as_str(), "n11");
        assert_eq!(store.list().unwrap().len(), 12);
    }

    #[test]
    fn unknown_or_unsafe_ids_load_nothing() {
        let store = JsonFileStore::open_in_memory().unwrap();
        assert!(store.load("snapshot-missing").unwrap().is_none());
        assert!(store.load("../etc/passwd").unwrap().is_none());
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn foreign_files_are_ignored() {
        let store = JsonFileStore::open_in_memory().unwrap();
        fs::write(store.dir().join("notes.txt"), "hello").unwrap();
        fs::write(store.dir().join("other.json"), "{}").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b");
        let store = JsonFileStore::open(&path).unwrap();
        store.save(&snapshot_with("x")).unwrap();
        assert!(path.is_dir());
    }
}
