//! Duplicate-concept merging

use crate::graph::{normalize_key, ConceptGraph, ConceptOptions, Edge, Timestamp};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Build the alias → canonical map from `(canonical, alias)` rules.
///
/// Both sides are normalized like concept ids. Later rules for the same
/// alias override earlier ones. Nothing in the graph is touched.
pub fn merge_duplicates<I, C, A>(rules: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (C, A)>,
    C: AsRef<str>,
    A: AsRef<str>,
{
    rules
        .into_iter()
        .map(|(canonical, alias)| (normalize_key(alias.as_ref()), normalize_key(canonical.as_ref())))
        .filter(|(alias, canonical)| !alias.is_empty() && !canonical.is_empty() && alias != canonical)
        .collect()
}

/// Counts from [`apply_merges`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub concepts_merged: usize,
    pub edges_rekeyed: usize,
    pub self_loops_dropped: usize,
}

/// Follow `a → b → c` to the end of the chain, stopping at the first
/// repeated id when the map contains a cycle.
fn resolve(map: &HashMap<String, String>, start: &str) -> String {
    let mut seen = HashSet::new();
    let mut current = start.to_string();
    seen.insert(current.clone());
    while let Some(next) = map.get(&current) {
        if !seen.insert(next.clone()) {
            break;
        }
        current = next.clone();
    }
    current
}

/// Fold every alias concept present in the graph into its canonical concept.
///
/// Incident edges are re-keyed onto the canonical id; edges that collapse
/// onto the same pair add their weight and provenance, and edges that
/// collapse into a self-pair are dropped. Aliases are processed in sorted
/// order so the outcome is deterministic.
pub fn apply_merges(
    graph: &mut ConceptGraph,
    map: &HashMap<String, String>,
    now: Timestamp,
) -> MergeReport {
    let mut report = MergeReport::default();

    let mut aliases: Vec<&String> = map.keys().collect();
    aliases.sort();

    for alias in aliases {
        let canonical = resolve(map, alias);
        if canonical == *alias || graph.concept(alias).is_none() {
            continue;
        }

        let edges = graph.take_edges_touching(alias);
        let Some(absorbed) = graph.remove_concept(alias) else {
            continue;
        };

        graph.upsert_concept_at(&canonical, ConceptOptions::typed(absorbed.concept_type), now);
        if let Some(target) = graph.concept_mut(&canonical) {
            target.aliases.extend(absorbed.aliases);
            target.weight = (target.weight + absorbed.weight).max(0.0);
            target.last_seen_at = target.last_seen_at.max(absorbed.last_seen_at);
            target.pruned = target.pruned && absorbed.pruned;
        }

        for edge in edges {
            let other = if edge.source.as_str() == alias.as_str() {
                &edge.target
            } else {
                &edge.source
            };
            if other.as_str() == canonical {
                report.self_loops_dropped += 1;
                continue;
            }

            let mut rekeyed = Edge::new(&canonical, other.as_str(), edge.last_seen_at);
            rekeyed.weight = edge.weight.max(0.0);
            rekeyed.provenance = edge.provenance;
            rekeyed.pruned = edge.pruned;
            graph.absorb_edge(rekeyed);
            report.edges_rekeyed += 1;
        }

        debug!(alias = %alias, canonical = %canonical, "concept merged");
        report.concepts_merged += 1;
    }

    report
}
