//! Live session API.
//!
//! `LiveGraph` is the single entry point for a running session: it owns the
//! shared registry, the ingest pipeline and (optionally) the enrichment
//! adapter. Clones share the same state, so ingest, ticks and enrichment can
//! run from different tasks.

use std::sync::Arc;

use crate::config::MindmapConfig;
use crate::enrichment::{AnalysisOutcome, EnrichmentAdapter, EnrichmentResult, EnrichmentService};
use crate::graph::{now_ms, ConceptGraph, GraphResult, Segment, SharedGraph, Snapshot, Subgraph, Timestamp};
use crate::ingest::{IngestOutcome, IngestPipeline};
use crate::scoring::{self, apply_merges, merge_duplicates, MergeReport, PruneReport, SignalKind};
use tracing::info;

/// Single entry point for a live concept-graph session.
#[derive(Clone)]
pub struct LiveGraph {
    config: Arc<MindmapConfig>,
    graph: SharedGraph,
    pipeline: Arc<IngestPipeline>,
    enrichment: Option<Arc<EnrichmentAdapter>>,
}

impl LiveGraph {
    /// Create a session with local signals only.
    pub fn new(config: MindmapConfig) -> Self {
        let pipeline = IngestPipeline::new(config.ingest.clone());
        Self {
            config: Arc::new(config),
            graph: SharedGraph::new(ConceptGraph::new()),
            pipeline: Arc::new(pipeline),
            enrichment: None,
        }
    }

    /// Attach an enrichment service.
    pub fn with_service(mut self, service: Arc<dyn EnrichmentService>) -> Self {
        let adapter = EnrichmentAdapter::new(service, self.config.enrichment.clone());
        self.enrichment = Some(Arc::new(adapter));
        self
    }

    pub fn config(&self) -> &MindmapConfig {
        &self.config
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    pub fn enrichment(&self) -> Option<&EnrichmentAdapter> {
        self.enrichment.as_deref()
    }

    // --- Write ---

    pub fn ingest(&self, text: &str, kind: SignalKind) -> IngestOutcome {
        self.ingest_at(text, kind, now_ms())
    }

    pub fn ingest_at(&self, text: &str, kind: SignalKind, now: Timestamp) -> IngestOutcome {
        self.graph.write(|g| self.pipeline.ingest(g, text, kind, now))
    }

    /// Decay every weight once, then prune with the configured options.
    pub fn tick(&self) -> (Subgraph, PruneReport) {
        self.tick_at(now_ms())
    }

    pub fn tick_at(&self, now: Timestamp) -> (Subgraph, PruneReport) {
        let scoring = &self.config.scoring;
        let options = scoring.prune_options();
        self.graph.write(|g| {
            scoring::decay_all(g, scoring.decay_factor, now);
            scoring::prune(g, &options)
        })
    }

    /// Send the most recent segments to the enrichment service if admitted.
    ///
    /// `Ok(None)` without a service, when disabled, or when not admitted.
    pub async fn enrich(&self) -> EnrichmentResult<Option<AnalysisOutcome>> {
        let Some(adapter) = &self.enrichment else {
            return Ok(None);
        };
        let recent = self
            .graph
            .read(|g| g.recent_text(self.config.ingest.recent_segments));
        adapter.analyze(&self.graph, &recent).await
    }

    /// Ask the service for similarity connections of `concept` and fold them.
    pub async fn connect(&self, concept: &str) -> EnrichmentResult<usize> {
        match &self.enrichment {
            Some(adapter) => adapter.connect(&self.graph, concept).await,
            None => Ok(0),
        }
    }

    /// Merge alias concepts into their canonical concepts.
    pub fn merge<I, C, A>(&self, rules: I) -> MergeReport
    where
        I: IntoIterator<Item = (C, A)>,
        C: AsRef<str>,
        A: AsRef<str>,
    {
        let map = merge_duplicates(rules);
        let now = now_ms();
        self.graph.write(|g| apply_merges(g, &map, now))
    }

    // --- Read ---

    pub fn subgraph(&self, max_nodes: usize) -> Subgraph {
        self.graph.read(|g| g.subgraph(max_nodes))
    }

    pub fn segments_for_concept(&self, concept_id: &str, k: usize) -> Vec<Segment> {
        self.graph.read(|g| g.segments_for_concept(concept_id, k))
    }

    // --- Lifecycle ---

    pub fn snapshot(&self) -> Snapshot {
        self.graph.read(|g| g.snapshot())
    }

    /// Replace the registry with the contents of `snapshot`.
    ///
    /// On error the current registry is left untouched.
    pub fn restore(&self, snapshot: Snapshot) -> GraphResult<()> {
        let restored = ConceptGraph::from_snapshot(snapshot)?;
        info!(
            concepts = restored.concept_count(),
            edges = restored.edge_count(),
            segments = restored.segment_count(),
            "registry restored"
        );
        self.graph.replace(restored);
        self.pipeline.clear_recent();
        Ok(())
    }

    /// Clear all state, including the recency filter.
    pub fn reset(&self) {
        self.graph.write(|g| g.reset());
        self.pipeline.clear_recent();
    }
}
