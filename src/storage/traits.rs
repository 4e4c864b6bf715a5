//! Storage trait definitions

use crate::graph::{GraphError, Snapshot};
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A stored snapshot as listed by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Store-specific key (file stem or row id)
    pub id: String,
    pub exported_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends
///
/// Implementations must be thread-safe (Send + Sync). Snapshots are
/// immutable once saved; "latest" means most recently saved.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot and return its id
    fn save(&self, snapshot: &Snapshot) -> StorageResult<String>;

    /// Load a snapshot by id
    fn load(&self, id: &str) -> StorageResult<Option<Snapshot>>;

    /// Load the most recently saved snapshot
    fn load_latest(&self) -> StorageResult<Option<Snapshot>>;

    /// All stored snapshots, oldest first
    fn list(&self) -> StorageResult<Vec<SnapshotInfo>>;
}

/// Trait for opening stores (separate from SnapshotStore for object safety)
pub trait OpenStore: SnapshotStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
