//! SQLite storage backend for snapshots

use super::traits::{OpenStore, SnapshotInfo, SnapshotStore, StorageError, StorageResult};
use crate::graph::Snapshot;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed snapshot store
///
/// One row per snapshot, body stored as JSON text. Thread-safe via internal
/// mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exported_at TEXT NOT NULL,
                body TEXT NOT NULL
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&conn)
    }
}

fn parse_timestamp(text: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(format!("{}: {}", text, e)))
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SnapshotStore for SqliteStore {
    fn save(&self, snapshot: &Snapshot) -> StorageResult<String> {
        let body = serde_json::to_string(snapshot)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (exported_at, body) VALUES (?1, ?2)",
                params![snapshot.exported_at.to_rfc3339(), body],
            )?;
            Ok(conn.last_insert_rowid().to_string())
        })
    }

    fn load(&self, id: &str) -> StorageResult<Option<Snapshot>> {
        let Ok(rowid) = id.parse::<i64>() else {
            return Ok(None);
        };
        let body: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT body FROM snapshots WHERE id = ?1", params![rowid], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;
        body.map(|b| Snapshot::from_json(&b).map_err(StorageError::from))
            .transpose()
    }

    fn load_latest(&self) -> StorageResult<Option<Snapshot>> {
        let body: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT body FROM snapshots ORDER BY id DESC LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;
        body.map(|b| Snapshot::from_json(&b).map_err(StorageError::from))
            .transpose()
    }

    fn list(&self) -> StorageResult<Vec<SnapshotInfo>> {
        let rows: Vec<(i64, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, exported_at FROM snapshots ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, exported_at)| {
                Ok(SnapshotInfo {
                    id: id.to_string(),
                    exported_at: parse_timestamp(&exported_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptGraph, ConceptOptions, NewSegment, SourceKind};

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_graph() -> ConceptGraph {
        let mut graph = ConceptGraph::new();
        graph.upsert_concept_at("pricing", ConceptOptions::default(), 0);
        graph.touch_concept("pricing", 2.0, 0);
        graph.upsert_concept_at("sales", ConceptOptions::default(), 0);
        graph.upsert_edge("pricing", "sales", 1.0, SourceKind::Cooccur, 0);
        graph.add_segment(NewSegment::new("pricing sales", vec!["pricing".into(), "sales".into()], 0));
        graph
    }

    #[test]
    fn empty_store_has_nothing() {
        let store = create_test_store();
        assert!(store.load_latest().unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
        assert!(store.load("1").unwrap().is_none());
        assert!(store.load("not-a-number").unwrap().is_none());
    }

    #[test]
    fn save_and_load_latest() {
        let store = create_test_store();
        let graph = create_test_graph();

        let first = store.save(&ConceptGraph::new().snapshot()).unwrap();
        let second = store.save(&graph.snapshot()).unwrap();
        assert_ne!(first, second);

        let latest = store.load_latest().unwrap().unwrap();
        let restored = ConceptGraph::from_snapshot(latest).unwrap();
        assert_eq!(restored.top_k_nodes(10), graph.top_k_nodes(10));
        assert_eq!(restored.subgraph(10), graph.subgraph(10));

        let earliest = store.load(&first).unwrap().unwrap();
        assert!(earliest.nodes.is_empty());
    }

    #[test]
    fn list_is_oldest_first() {
        let store = create_test_store();
        let snapshot = create_test_graph().snapshot();
        let a = store.save(&snapshot).unwrap();
        let b = store.save(&snapshot).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|info| info.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mindmap.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&create_test_graph().snapshot()).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let snapshot = reopened.load_latest().unwrap().unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.segments.len(), 1);
    }
}
