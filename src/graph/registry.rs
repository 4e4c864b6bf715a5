//! ConceptGraph: the single source of truth for concepts, edges and segments

use super::concept::{normalize_key, now_ms, Concept, ConceptId, ConceptOptions, Timestamp, PAIR_SEPARATOR};
use super::edge::{canonical_pair, Edge, EdgeId, SourceKind};
use super::segment::{NewSegment, Segment, SegmentId};
use super::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in registry operations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Top-K concepts plus the edges among them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Concept>,
    pub edges: Vec<Edge>,
}

type EdgeKey = (ConceptId, ConceptId);

/// The registry owning all four collections.
///
/// Identity is by normalized id, never by reference. Concepts and edges are
/// created lazily on first write; segments are append-only.
#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    concepts: HashMap<ConceptId, Concept>,
    edges: HashMap<EdgeKey, Edge>,
    segments: Vec<Segment>,
    /// token → ids of the segments containing it
    reverse_index: HashMap<String, BTreeSet<SegmentId>>,
    next_segment: u64,
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every collection and restart the segment sequence.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // --- Concepts ---

    /// Create the concept for `label` if absent. Existing concepts are left
    /// untouched (weight and aliases are not reset).
    ///
    /// Returns `None` when the label normalizes to an empty key.
    pub fn upsert_concept(&mut self, label: &str, options: ConceptOptions) -> Option<&Concept> {
        self.upsert_concept_at(label, options, now_ms())
    }

    pub fn upsert_concept_at(
        &mut self,
        label: &str,
        options: ConceptOptions,
        now: Timestamp,
    ) -> Option<&Concept> {
        let id = ConceptId::normalized(label);
        if id.is_empty() {
            return None;
        }
        let concept = self.concepts.entry(id).or_insert_with_key(|id| {
            debug!(concept = %id, "concept created");
            Concept::new(label, &options, now)
        });
        Some(&*concept)
    }

    /// Register `alias` on the concept named by `canonical_label`.
    ///
    /// No-op when the concept does not exist; never auto-creates.
    pub fn add_alias(&mut self, canonical_label: &str, alias: &str) -> bool {
        let alias = normalize_key(alias);
        if alias.is_empty() {
            return false;
        }
        match self.concepts.get_mut(normalize_key(canonical_label).as_str()) {
            Some(concept) => {
                concept.aliases.insert(alias);
                true
            }
            None => false,
        }
    }

    /// Add `delta` to a concept's weight. Returns false for unknown ids.
    pub fn touch_concept(&mut self, id: &str, delta: f64, now: Timestamp) -> bool {
        match self.concepts.get_mut(id) {
            Some(concept) => {
                concept.weight += delta;
                concept.last_seen_at = now;
                true
            }
            None => false,
        }
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.get(id)
    }

    pub(crate) fn concept_mut(&mut self, id: &str) -> Option<&mut Concept> {
        self.concepts.get_mut(id)
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub(crate) fn concepts_mut(&mut self) -> impl Iterator<Item = &mut Concept> {
        self.concepts.values_mut()
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Remove a concept and every edge touching it.
    pub fn remove_concept(&mut self, id: &str) -> Option<Concept> {
        let removed = self.concepts.remove(id)?;
        self.edges.retain(|_, edge| !edge.touches(id));
        Some(removed)
    }

    // --- Edges ---

    /// Accumulate `delta` on the undirected edge `{a, b}` under `kind`.
    ///
    /// Returns `None` for self-pairs or empty ids.
    pub fn upsert_edge(
        &mut self,
        a: &str,
        b: &str,
        delta: f64,
        kind: SourceKind,
        now: Timestamp,
    ) -> Option<EdgeId> {
        if a.is_empty() || b.is_empty() || a == b {
            return None;
        }
        if a.contains(PAIR_SEPARATOR) || b.contains(PAIR_SEPARATOR) {
            return None;
        }
        let edge = self
            .edges
            .entry(canonical_pair(a, b))
            .or_insert_with(|| Edge::new(a, b, now));
        edge.reinforce(delta, kind, now);
        Some(edge.id.clone())
    }

    /// Look up an edge by either endpoint order
    pub fn edge(&self, a: &str, b: &str) -> Option<&Edge> {
        self.edges.get(&canonical_pair(a, b))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Remove and return every edge touching `id`
    pub(crate) fn take_edges_touching(&mut self, id: &str) -> Vec<Edge> {
        let keys: Vec<EdgeKey> = self
            .edges
            .iter()
            .filter(|(_, edge)| edge.touches(id))
            .map(|(key, _)| key.clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| self.edges.remove(&key))
            .collect()
    }

    /// Insert an edge, adding into any edge already stored for the same pair.
    pub(crate) fn absorb_edge(&mut self, edge: Edge) {
        match self.edges.get_mut(&edge.key()) {
            Some(existing) => {
                existing.weight += edge.weight;
                existing.provenance.absorb(&edge.provenance);
                existing.last_seen_at = existing.last_seen_at.max(edge.last_seen_at);
                existing.pruned = existing.pruned && edge.pruned;
            }
            None => {
                self.edges.insert(edge.key(), edge);
            }
        }
    }

    pub(crate) fn retain_edges(&mut self, mut keep: impl FnMut(&Edge) -> bool) {
        self.edges.retain(|_, edge| keep(edge));
    }

    pub(crate) fn retain_concepts(&mut self, mut keep: impl FnMut(&Concept) -> bool) {
        self.concepts.retain(|_, concept| keep(concept));
    }

    // --- Segments ---

    /// Append a segment, index its tokens, and return its assigned id.
    pub fn add_segment(&mut self, segment: NewSegment) -> SegmentId {
        let id = SegmentId::from_sequence(self.next_segment);
        self.next_segment += 1;

        let segment = Segment {
            id: id.clone(),
            text: segment.text,
            tokens: segment.tokens,
            created_at: segment.created_at,
        };
        self.index_segment(&segment);
        self.segments.push(segment);
        id
    }

    fn index_segment(&mut self, segment: &Segment) {
        for token in &segment.tokens {
            self.reverse_index
                .entry(token.to_lowercase())
                .or_default()
                .insert(segment.id.clone());
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Ids of the segments containing `token` (reverse index lookup)
    pub fn segments_with_token(&self, token: &str) -> Vec<SegmentId> {
        self.reverse_index
            .get(token.to_lowercase().as_str())
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `k` segments whose tokens fuzzily match `concept_id`,
    /// most recent first.
    pub fn segments_for_concept(&self, concept_id: &str, k: usize) -> Vec<Segment> {
        self.segments
            .iter()
            .rev()
            .filter(|segment| segment.mentions(concept_id))
            .take(k)
            .cloned()
            .collect()
    }

    /// Text of the last `n` segments joined by a space
    pub fn recent_text(&self, n: usize) -> String {
        let start = self.segments.len().saturating_sub(n);
        self.segments[start..]
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    // --- Views ---

    /// The `k` heaviest concepts, ties broken by id ascending.
    pub fn top_k_nodes(&self, k: usize) -> Vec<Concept> {
        let mut nodes: Vec<&Concept> = self.concepts.values().collect();
        nodes.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
        nodes.into_iter().take(k).cloned().collect()
    }

    /// Top-`max_nodes` concepts plus every edge with both endpoints among them.
    pub fn subgraph(&self, max_nodes: usize) -> Subgraph {
        let nodes = self.top_k_nodes(max_nodes);
        let node_set: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let mut edges: Vec<Edge> = self
            .edges
            .values()
            .filter(|e| node_set.contains(e.source.as_str()) && node_set.contains(e.target.as_str()))
            .cloned()
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        Subgraph { nodes, edges }
    }

    // --- Snapshots ---

    /// Plain serialization of the current contents.
    pub fn snapshot(&self) -> Snapshot {
        let mut nodes: Vec<Concept> = self.concepts.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        Snapshot {
            exported_at: chrono::Utc::now(),
            segments: self.segments.clone(),
            nodes,
            edges,
        }
    }

    /// Rebuild a registry from a snapshot.
    ///
    /// The reverse index is rebuilt from the segment log and the segment
    /// sequence resumes after the highest restored id.
    pub fn from_snapshot(snapshot: Snapshot) -> GraphResult<Self> {
        let mut graph = Self::new();

        for concept in snapshot.nodes {
            let key = ConceptId::normalized(concept.id.as_str());
            if key != concept.id {
                return Err(GraphError::InvalidSnapshot(format!(
                    "concept id '{}' is not normalized",
                    concept.id
                )));
            }
            if graph.concepts.insert(key, concept).is_some() {
                return Err(GraphError::InvalidSnapshot("duplicate concept id".to_string()));
            }
        }

        for edge in snapshot.edges {
            if edge.source == edge.target {
                return Err(GraphError::InvalidSnapshot(format!("self edge '{}'", edge.id)));
            }
            if edge.source.as_str().contains(PAIR_SEPARATOR) || edge.target.as_str().contains(PAIR_SEPARATOR) {
                return Err(GraphError::InvalidSnapshot(format!(
                    "edge endpoint contains '{}' in '{}'",
                    PAIR_SEPARATOR, edge.id
                )));
            }
            // Re-derive the canonical form rather than trusting the stored id.
            let mut restored = Edge::new(edge.source.as_str(), edge.target.as_str(), edge.last_seen_at);
            restored.weight = edge.weight;
            restored.provenance = edge.provenance;
            restored.pruned = edge.pruned;
            if graph.edges.insert(restored.key(), restored).is_some() {
                return Err(GraphError::InvalidSnapshot(format!("duplicate edge '{}'", edge.id)));
            }
        }

        let mut seen = HashSet::new();
        for segment in snapshot.segments {
            if !seen.insert(segment.id.clone()) {
                return Err(GraphError::InvalidSnapshot(format!(
                    "duplicate segment '{}'",
                    segment.id
                )));
            }
            if let Some(n) = segment.id.sequence() {
                let next = n.checked_add(1).ok_or_else(|| {
                    GraphError::InvalidSnapshot(format!("segment sequence '{}' out of range", segment.id))
                })?;
                graph.next_segment = graph.next_segment.max(next);
            }
            graph.index_segment(&segment);
            graph.segments.push(segment);
        }

        Ok(graph)
    }

    /// Verify the registry's structural invariants.
    ///
    /// Intended for tests; a violation is a programming error.
    pub fn check_invariants(&self) -> GraphResult<()> {
        for (key, concept) in &self.concepts {
            if *key != concept.id {
                return Err(GraphError::InvariantViolation(format!(
                    "concept stored under '{}' has id '{}'",
                    key, concept.id
                )));
            }
        }

        let mut edge_ids = HashSet::new();
        for ((source, target), edge) in &self.edges {
            if source >= target || *source != edge.source || *target != edge.target {
                return Err(GraphError::InvariantViolation(format!(
                    "edge '{}' is not stored under its canonical pair",
                    edge.id
                )));
            }
            if !edge_ids.insert(&edge.id) {
                return Err(GraphError::InvariantViolation(format!(
                    "edge id '{}' shared by two pairs",
                    edge.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for segment in &self.segments {
            if !seen.insert(&segment.id) {
                return Err(GraphError::InvariantViolation(format!(
                    "segment id '{}' reused",
                    segment.id
                )));
            }
            for token in &segment.tokens {
                let indexed = self
                    .reverse_index
                    .get(token.to_lowercase().as_str())
                    .map(|ids| ids.contains(&segment.id))
                    .unwrap_or(false);
                if !indexed {
                    return Err(GraphError::InvariantViolation(format!(
                        "token '{}' of '{}' missing from reverse index",
                        token, segment.id
                    )));
                }
            }
        }

        Ok(())
    }
}
