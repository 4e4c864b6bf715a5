//! Mindmap: live concept graph for streaming transcripts
//!
//! Turns a stream of short text segments into a weighted concept graph that
//! stays small and current. Cheap local signals (tokens, phrases,
//! co-occurrence) update the graph on every segment; a periodic, rate-limited
//! enrichment service adds concepts, relationships and aliases on top.
//!
//! # Core Concepts
//!
//! - **Concepts**: normalized topics/entities with a decaying weight
//! - **Edges**: undirected weighted relations with per-source provenance
//! - **Segments**: the immutable log of ingested text
//! - **Ticks**: periodic decay followed by top-K pruning
//!
//! # Example
//!
//! ```
//! use mindmap::{LiveGraph, MindmapConfig, SignalKind};
//!
//! let live = LiveGraph::new(MindmapConfig::default());
//! live.ingest("pricing drives the sales strategy", SignalKind::Final);
//! let (subgraph, _) = live.tick();
//! assert!(!subgraph.nodes.is_empty());
//! ```

pub mod api;
pub mod config;
pub mod enrichment;
pub mod graph;
pub mod ingest;
pub mod scoring;
pub mod storage;
pub mod text;

pub use api::LiveGraph;
pub use config::{ConfigError, ConfigResult, MindmapConfig};
pub use enrichment::{
    Analysis, CommandService, EnrichmentConfig, EnrichmentError, EnrichmentResult,
    EnrichmentService, MockService,
};
pub use graph::{
    Concept, ConceptGraph, ConceptId, ConceptType, Edge, EdgeId, GraphError, GraphResult, Segment,
    SegmentId, SharedGraph, Snapshot, SourceKind, Subgraph,
};
pub use ingest::{IngestConfig, IngestOutcome, IngestPipeline};
pub use scoring::{PrunePolicy, PruneReport, ScoringConfig, SignalKind};
pub use storage::{JsonFileStore, OpenStore, SnapshotStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
