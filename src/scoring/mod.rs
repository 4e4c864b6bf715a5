//! Scoring engine: weighted signals, decay, pruning and duplicate merging
//!
//! Every operation here mutates a [`ConceptGraph`] in place and runs to
//! completion; callers sharing a graph hold the write lock for the call.

mod merge;
mod prune;

pub use merge::{apply_merges, merge_duplicates, MergeReport};
pub use prune::{prune, PruneOptions, PrunePolicy, PruneReport};

use crate::graph::{ConceptGraph, SourceKind, Timestamp};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_DECAY_FACTOR: f64 = 0.995;
pub const DEFAULT_NODE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_EDGE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_MAX_NODES: usize = 80;

/// Multiplier applied to signals that are not final.
pub const PROVISIONAL_FACTOR: f64 = 0.4;

/// Whether a signal comes from settled or still-changing input
/// (e.g. an interim speech transcript).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    #[default]
    Final,
    Provisional,
}

impl SignalKind {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Final => 1.0,
            Self::Provisional => PROVISIONAL_FACTOR,
        }
    }
}

/// `"final"` parses to `Final`; any other string is provisional.
impl FromStr for SignalKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "final" { Self::Final } else { Self::Provisional })
    }
}

/// Touch a concept with `weight`, scaled by `kind`. Unknown ids are ignored.
pub fn apply_node_signal(
    graph: &mut ConceptGraph,
    id: &str,
    weight: f64,
    kind: SignalKind,
    now: Timestamp,
) -> bool {
    graph.touch_concept(id, weight * kind.multiplier(), now)
}

/// Reinforce each pair with `base_weight` under provenance `kind`.
///
/// Returns how many edges were touched (self-pairs and empty ids are skipped).
pub fn apply_edge_signals<'a, I>(
    graph: &mut ConceptGraph,
    pairs: I,
    kind: SourceKind,
    base_weight: f64,
    now: Timestamp,
) -> usize
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .filter_map(|(a, b)| graph.upsert_edge(a, b, base_weight, kind, now))
        .count()
}

/// Multiply every concept and edge weight by `factor` and stamp `now`.
///
/// A factor outside (0, 1) leaves the graph untouched. Returns whether decay
/// was applied.
pub fn decay_all(graph: &mut ConceptGraph, factor: f64, now: Timestamp) -> bool {
    if !factor.is_finite() || factor <= 0.0 || factor >= 1.0 {
        warn!(factor, "ignoring decay factor outside (0, 1)");
        return false;
    }

    for concept in graph.concepts_mut() {
        concept.weight *= factor;
        concept.last_seen_at = now;
    }
    for edge in graph.edges_mut() {
        edge.weight *= factor;
        edge.last_seen_at = now;
    }

    debug!(
        factor,
        concepts = graph.concept_count(),
        edges = graph.edge_count(),
        "decay applied"
    );
    true
}

/// Scoring parameters as they appear in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub decay_factor: f64,
    pub node_threshold: f64,
    pub edge_threshold: f64,
    pub max_nodes: usize,
    pub prune_policy: PrunePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_factor: DEFAULT_DECAY_FACTOR,
            node_threshold: DEFAULT_NODE_THRESHOLD,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            max_nodes: DEFAULT_MAX_NODES,
            prune_policy: PrunePolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            node_threshold: self.node_threshold,
            edge_threshold: self.edge_threshold,
            max_nodes: self.max_nodes,
            policy: self.prune_policy,
        }
    }
}
