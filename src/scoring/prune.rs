//! Threshold + top-K pruning

use super::{DEFAULT_EDGE_THRESHOLD, DEFAULT_MAX_NODES, DEFAULT_NODE_THRESHOLD};
use crate::graph::{ConceptGraph, ConceptId, Subgraph};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// What happens to entities that fail the prune check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunePolicy {
    /// Flag with `pruned = true`; the flag is cleared if the entity recovers
    #[default]
    SoftDelete,
    /// Remove from the registry
    Evict,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneOptions {
    pub node_threshold: f64,
    pub edge_threshold: f64,
    pub max_nodes: usize,
    pub policy: PrunePolicy,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            node_threshold: DEFAULT_NODE_THRESHOLD,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            max_nodes: DEFAULT_MAX_NODES,
            policy: PrunePolicy::SoftDelete,
        }
    }
}

impl PruneOptions {
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_policy(mut self, policy: PrunePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Counts from one prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Concepts that failed the check (flagged or evicted)
    pub concepts_pruned: usize,
    /// Edges that failed the check (flagged or evicted)
    pub edges_pruned: usize,
    /// Previously flagged concepts whose flag was cleared
    pub concepts_restored: usize,
}

/// Prune concepts that are both below `node_threshold` and outside the top
/// `max_nodes`, and edges below `edge_threshold` that lost an endpoint.
///
/// Returns the post-prune `subgraph(max_nodes)`.
pub fn prune(graph: &mut ConceptGraph, options: &PruneOptions) -> (Subgraph, PruneReport) {
    let top: HashSet<ConceptId> = graph
        .top_k_nodes(options.max_nodes)
        .into_iter()
        .map(|concept| concept.id)
        .collect();

    let mut report = PruneReport::default();
    let mut doomed: HashSet<ConceptId> = HashSet::new();

    for concept in graph.concepts_mut() {
        let fails = concept.weight < options.node_threshold && !top.contains(&concept.id);
        if fails {
            report.concepts_pruned += 1;
            doomed.insert(concept.id.clone());
        } else if concept.pruned {
            report.concepts_restored += 1;
        }
        concept.pruned = fails;
    }

    let mut doomed_edges = HashSet::new();
    for edge in graph.edges_mut() {
        let endpoints_survive = !doomed.contains(&edge.source) && !doomed.contains(&edge.target);
        let fails = edge.weight < options.edge_threshold && !endpoints_survive;
        if fails {
            report.edges_pruned += 1;
            doomed_edges.insert(edge.id.clone());
        }
        edge.pruned = fails;
    }

    if options.policy == PrunePolicy::Evict {
        graph.retain_edges(|edge| {
            !doomed_edges.contains(&edge.id)
                && !doomed.contains(&edge.source)
                && !doomed.contains(&edge.target)
        });
        graph.retain_concepts(|concept| !doomed.contains(&concept.id));
    }

    if report.concepts_pruned > 0 || report.edges_pruned > 0 {
        info!(
            concepts = report.concepts_pruned,
            edges = report.edges_pruned,
            restored = report.concepts_restored,
            policy = ?options.policy,
            "prune pass"
        );
    }

    (graph.subgraph(options.max_nodes), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptOptions, SourceKind};

    fn weighted(weights: &[(&str, f64)]) -> ConceptGraph {
        let mut graph = ConceptGraph::new();
        for (label, weight) in weights {
            graph.upsert_concept_at(label, ConceptOptions::default(), 0);
            graph.touch_concept(label, *weight, 0);
        }
        graph
    }

    #[test]
    fn prunes_only_low_weight_outside_top_k() {
        let mut graph = weighted(&[("a", 10.0), ("b", 3.0), ("c", 0.01)]);
        let options = PruneOptions::default().with_max_nodes(2);

        let (sub, report) = prune(&mut graph, &options);

        assert!(!graph.concept("a").unwrap().pruned);
        assert!(!graph.concept("b").unwrap().pruned);
        assert!(graph.concept("c").unwrap().pruned);
        assert_eq!(report.concepts_pruned, 1);

        let ids: Vec<&str> = sub.nodes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn low_weight_inside_top_k_survives() {
        let mut graph = weighted(&[("a", 0.01), ("b", 0.02)]);
        let (_, report) = prune(&mut graph, &PruneOptions::default());
        assert_eq!(report.concepts_pruned, 0);
    }

    #[test]
    fn recovered_concept_loses_its_flag() {
        let mut graph = weighted(&[("a", 10.0), ("b", 3.0), ("c", 0.01)]);
        let options = PruneOptions::default().with_max_nodes(2);
        prune(&mut graph, &options);
        assert!(graph.concept("c").unwrap().pruned);

        graph.touch_concept("c", 20.0, 1);
        let (_, report) = prune(&mut graph, &options);

        assert!(!graph.concept("c").unwrap().pruned);
        assert_eq!(report.concepts_restored, 1);
    }

    #[test]
    fn weak_edges_survive_only_with_both_endpoints() {
        let mut graph = weighted(&[("a", 10.0), ("b", 3.0), ("c", 0.01)]);
        graph.upsert_edge("a", "b", 0.01, SourceKind::Cooccur, 0);
        graph.upsert_edge("a", "c", 0.01, SourceKind::Cooccur, 0);
        graph.upsert_edge("b", "c", 1.0, SourceKind::Cooccur, 0);

        let (_, report) = prune(&mut graph, &PruneOptions::default().with_max_nodes(2));

        assert!(!graph.edge("a", "b").unwrap().pruned);
        assert!(graph.edge("a", "c").unwrap().pruned);
        assert!(!graph.edge("b", "c").unwrap().pruned, "strong edges are kept");
        assert_eq!(report.edges_pruned, 1);
    }

    #[test]
    fn evict_policy_removes_entities() {
        let mut graph = weighted(&[("a", 10.0), ("b", 3.0), ("c", 0.01)]);
        graph.upsert_edge("a", "c", 1.0, SourceKind::Cooccur, 0);
        graph.upsert_edge("a", "b", 1.0, SourceKind::Cooccur, 0);

        let options = PruneOptions::default()
            .with_max_nodes(2)
            .with_policy(PrunePolicy::Evict);
        let (sub, report) = prune(&mut graph, &options);

        assert_eq!(report.concepts_pruned, 1);
        assert!(graph.concept("c").is_none());
        assert!(graph.edge("a", "c").is_none(), "incident edges go with the concept");
        assert!(graph.edge("a", "b").is_some());
        assert_eq!(sub.nodes.len(), 2);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn prune_on_empty_graph() {
        let mut graph = ConceptGraph::new();
        let (sub, report) = prune(&mut graph, &PruneOptions::default());
        assert_eq!(sub, Subgraph::default());
        assert_eq!(report, PruneReport::default());
    }
}
