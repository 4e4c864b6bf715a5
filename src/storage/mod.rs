//! Snapshot storage backends
//!
//! Snapshots are persisted through the `SnapshotStore` trait. `JsonFileStore`
//! keeps one export-format file per snapshot; `SqliteStore` keeps them as
//! rows in a single database file.

mod json;
mod sqlite;
mod traits;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;
pub use traits::{OpenStore, SnapshotInfo, SnapshotStore, StorageError, StorageResult};
