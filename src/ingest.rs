//! Ingest pipeline: one text segment → segment log entry + local signals
//!
//! Each accepted segment is stored and reverse-indexed, its distinct tokens
//! and frequent phrases become topic concepts, and tokens that occur close
//! to each other reinforce `cooccur` edges.

use crate::graph::{ConceptGraph, ConceptOptions, ConceptType, NewSegment, SegmentId, SourceKind, Timestamp};
use crate::scoring::{apply_edge_signals, apply_node_signal, SignalKind};
use crate::text::{canonicalize, extract_phrases, tokenize, RecentFilter, DEFAULT_CAPACITY, DEFAULT_WINDOW_MS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Ingest parameters as they appear in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Weight per token occurrence
    pub token_weight: f64,
    /// Weight per phrase occurrence
    pub phrase_weight: f64,
    /// Weight added to an edge per segment in which its tokens co-occur
    pub cooccur_weight: f64,
    /// Maximum distance in token positions for a co-occurrence
    pub cooccur_window: usize,
    /// Tokens per phrase; values below 2 disable phrases
    pub phrase_window: usize,
    pub dedup_window_ms: i64,
    pub dedup_capacity: usize,
    /// Segments sampled as enrichment input
    pub recent_segments: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            token_weight: 1.0,
            phrase_weight: 1.5,
            cooccur_weight: 0.5,
            cooccur_window: 4,
            phrase_window: 2,
            dedup_window_ms: DEFAULT_WINDOW_MS,
            dedup_capacity: DEFAULT_CAPACITY,
            recent_segments: 8,
        }
    }
}

/// What happened to one input segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nothing but whitespace
    Empty,
    /// Same text seen within the dedup window
    Duplicate,
    Ingested {
        segment_id: SegmentId,
        /// Concepts signalled (distinct tokens plus phrases)
        concepts: usize,
        /// Co-occurrence edges reinforced
        edges: usize,
    },
}

pub struct IngestPipeline {
    config: IngestConfig,
    filter: RecentFilter,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Self {
        let filter = RecentFilter::with_capacity(config.dedup_window_ms, config.dedup_capacity);
        Self { config, filter }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Forget every remembered text hash.
    pub fn clear_recent(&self) {
        self.filter.clear();
    }

    pub fn ingest(
        &self,
        graph: &mut ConceptGraph,
        text: &str,
        kind: SignalKind,
        now: Timestamp,
    ) -> IngestOutcome {
        let text = text.trim();
        if text.is_empty() {
            return IngestOutcome::Empty;
        }
        if self.filter.is_duplicate(text, now) {
            debug!(chars = text.chars().count(), "duplicate segment dropped");
            return IngestOutcome::Duplicate;
        }

        let tokens = tokenize(text);
        let segment_id = graph.add_segment(NewSegment::new(text, tokens.clone(), now));

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *occurrences.entry(token.as_str()).or_default() += 1;
        }

        let topic = ConceptOptions::typed(ConceptType::Topic);
        let mut concepts = 0;

        for pair in canonicalize(&tokens) {
            let count = occurrences.get(pair.canonical.as_str()).copied().unwrap_or(1);
            if graph.upsert_concept_at(&pair.canonical, topic.clone(), now).is_some() {
                apply_node_signal(
                    graph,
                    &pair.canonical,
                    self.config.token_weight * count as f64,
                    kind,
                    now,
                );
                concepts += 1;
            }
        }

        if self.config.phrase_window >= 2 {
            for phrase in extract_phrases(&tokens, self.config.phrase_window) {
                if graph.upsert_concept_at(&phrase.phrase, topic.clone(), now).is_some() {
                    apply_node_signal(
                        graph,
                        &phrase.phrase,
                        self.config.phrase_weight * phrase.score as f64,
                        kind,
                        now,
                    );
                    concepts += 1;
                }
            }
        }

        let pairs = cooccurring_pairs(&tokens, self.config.cooccur_window);
        let edges = apply_edge_signals(
            graph,
            pairs.iter().map(|(a, b)| (*a, *b)),
            SourceKind::Cooccur,
            self.config.cooccur_weight,
            now,
        );

        debug!(
            segment = %segment_id,
            tokens = tokens.len(),
            concepts,
            edges,
            "segment ingested"
        );
        IngestOutcome::Ingested {
            segment_id,
            concepts,
            edges,
        }
    }
}

/// Distinct unordered pairs of different tokens at most `window` positions apart.
fn cooccurring_pairs(tokens: &[String], window: usize) -> BTreeSet<(&str, &str)> {
    let mut pairs = BTreeSet::new();
    for (i, a) in tokens.iter().enumerate() {
        for b in tokens.iter().skip(i + 1).take(window) {
            if a != b {
                let pair = if a < b { (a.as_str(), b.as_str()) } else { (b.as_str(), a.as_str()) };
                pairs.insert(pair);
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(IngestConfig::default())
    }

    #[test]
    fn whitespace_is_empty() {
        let mut graph = ConceptGraph::new();
        assert_eq!(pipeline().ingest(&mut graph, "  \n ", SignalKind::Final, 0), IngestOutcome::Empty);
        assert_eq!(graph.segment_count(), 0);
    }

    #[test]
    fn duplicate_within_window_is_dropped() {
        let mut graph = ConceptGraph::new();
        let pipeline = pipeline();

        let first = pipeline.ingest(&mut graph, "pricing matters", SignalKind::Final, 0);
        let second = pipeline.ingest(&mut graph, "pricing matters", SignalKind::Final, 500);
        let third = pipeline.ingest(&mut graph, "pricing matters", SignalKind::Final, 1500);

        assert!(matches!(first, IngestOutcome::Ingested { .. }));
        assert_eq!(second, IngestOutcome::Duplicate);
        assert!(matches!(third, IngestOutcome::Ingested { .. }));
        assert_eq!(graph.segment_count(), 2);
    }

    #[test]
    fn tokens_and_phrases_become_weighted_concepts() {
        let mut graph = ConceptGraph::new();
        let outcome = pipeline().ingest(
            &mut graph,
            "Sales strategy, then more sales strategy!",
            SignalKind::Final,
            0,
        );

        // tokens: sales strategy then sales strategy
        match outcome {
            IngestOutcome::Ingested { concepts, .. } => assert_eq!(concepts, 3 + 3),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(graph.concept("sales").unwrap().weight, 2.0);
        assert_eq!(graph.concept("then").unwrap().weight, 1.0);
        assert_eq!(graph.concept("sales strategy").unwrap().weight, 3.0);
        assert_eq!(graph.concept("strategy then").unwrap().weight, 1.5);
    }

    #[test]
    fn provisional_segments_are_discounted() {
        let mut graph = ConceptGraph::new();
        pipeline().ingest(&mut graph, "pricing", SignalKind::Provisional, 0);
        assert!((graph.concept("pricing").unwrap().weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn cooccurrence_respects_window() {
        let config = IngestConfig {
            cooccur_window: 1,
            phrase_window: 0,
            ..Default::default()
        };
        let mut graph = ConceptGraph::new();
        let outcome = IngestPipeline::new(config).ingest(
            &mut graph,
            "alpha bravo charlie",
            SignalKind::Final,
            0,
        );

        assert!(matches!(outcome, IngestOutcome::Ingested { edges: 2, .. }));
        let edge = graph.edge("bravo", "alpha").unwrap();
        assert_eq!(edge.weight, 0.5);
        assert_eq!(edge.provenance.cooccur, 0.5);
        assert!(graph.edge("alpha", "charlie").is_none());
    }

    #[test]
    fn repeated_pairs_count_once_per_segment() {
        let mut graph = ConceptGraph::new();
        pipeline().ingest(&mut graph, "pricing sales pricing sales", SignalKind::Final, 0);
        assert_eq!(graph.edge("pricing", "sales").unwrap().weight, 0.5);
    }

    #[test]
    fn stopword_only_segments_are_still_logged() {
        let mut graph = ConceptGraph::new();
        let outcome = pipeline().ingest(&mut graph, "and so it is", SignalKind::Final, 0);

        assert!(matches!(outcome, IngestOutcome::Ingested { concepts: 0, edges: 0, .. }));
        assert_eq!(graph.segment_count(), 1);
        assert!(graph.segments()[0].tokens.is_empty());
    }

    #[test]
    fn segments_are_indexed_by_token() {
        let mut graph = ConceptGraph::new();
        pipeline().ingest(&mut graph, "pricing shapes strategy", SignalKind::Final, 0);
        assert_eq!(graph.segments_with_token("strategy").len(), 1);
        graph.check_invariants().unwrap();
    }
}
