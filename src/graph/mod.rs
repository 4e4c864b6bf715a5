//! State registry: concepts, edges, segments and the token reverse index

mod concept;
mod edge;
mod registry;
mod segment;
mod shared;
mod snapshot;

#[cfg(test)]
mod tests;

pub use concept::{
    normalize_key, now_ms, Concept, ConceptId, ConceptOptions, ConceptType, Timestamp,
    PAIR_SEPARATOR,
};
pub use edge::{canonical_pair, Edge, EdgeId, Provenance, SourceKind};
pub use registry::{ConceptGraph, GraphError, GraphResult, Subgraph};
pub use segment::{NewSegment, Segment, SegmentId};
pub use shared::SharedGraph;
pub use snapshot::Snapshot;
