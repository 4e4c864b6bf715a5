//! Folding enrichment results into the registry

use super::response::Analysis;
use super::service::{Connection, MIN_CONNECTION_STRENGTH};
use crate::graph::{normalize_key, ConceptGraph, ConceptOptions, ConceptType, SourceKind, Timestamp};
use serde::Serialize;
use tracing::debug;

/// Weight added to each concept named by the service.
pub const AI_BOOST: f64 = 5.0;

/// Upper bound for a single relationship's contribution.
pub const MAX_STRENGTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldOptions {
    pub ai_boost: f64,
    pub max_strength: f64,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            ai_boost: AI_BOOST,
            max_strength: MAX_STRENGTH,
        }
    }
}

/// What a fold changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoldReport {
    pub concepts: usize,
    pub relationships: usize,
    pub aliases: usize,
    /// Entries dropped for empty or self-referencing endpoints
    pub skipped: usize,
}

/// Missing, zero or non-finite strength counts as 1; the result is
/// clamped to `[0, max]`.
pub fn normalize_strength(strength: Option<f64>, max: f64) -> f64 {
    let raw = match strength {
        Some(s) if s.is_finite() && s != 0.0 => s,
        _ => 1.0,
    };
    raw.clamp(0.0, max.max(0.0))
}

pub fn apply_analysis(graph: &mut ConceptGraph, analysis: &Analysis, now: Timestamp) -> FoldReport {
    apply_analysis_with(graph, analysis, &FoldOptions::default(), now)
}

/// Fold each present field independently.
///
/// Concepts are upserted as topics and boosted; relationship endpoints are
/// upserted without weight and the edge reinforced with `ai` provenance;
/// aliases only attach to concepts that already exist.
pub fn apply_analysis_with(
    graph: &mut ConceptGraph,
    analysis: &Analysis,
    options: &FoldOptions,
    now: Timestamp,
) -> FoldReport {
    let mut report = FoldReport::default();
    let topic = ConceptOptions::typed(ConceptType::Topic);

    for concept in analysis.concepts.iter().flatten() {
        let Some(id) = graph
            .upsert_concept_at(concept, topic.clone(), now)
            .map(|c| c.id.clone())
        else {
            report.skipped += 1;
            continue;
        };
        graph.touch_concept(id.as_str(), options.ai_boost, now);
        report.concepts += 1;
    }

    for rel in analysis.relationships.iter().flatten() {
        let source = normalize_key(&rel.source);
        let target = normalize_key(&rel.target);
        if source.is_empty() || target.is_empty() || source == target {
            report.skipped += 1;
            continue;
        }
        graph.upsert_concept_at(&rel.source, topic.clone(), now);
        graph.upsert_concept_at(&rel.target, topic.clone(), now);

        let strength = normalize_strength(rel.strength, options.max_strength);
        if graph
            .upsert_edge(&source, &target, strength, SourceKind::Ai, now)
            .is_some()
        {
            report.relationships += 1;
        }
    }

    for hint in analysis.aliases.iter().flatten() {
        if graph.add_alias(&hint.canonical, &hint.alias) {
            report.aliases += 1;
        } else {
            report.skipped += 1;
        }
    }

    debug!(
        concepts = report.concepts,
        relationships = report.relationships,
        aliases = report.aliases,
        skipped = report.skipped,
        "analysis folded"
    );
    report
}

/// Fold similarity connections for `new_node` as `sim` edges weighted by
/// strength. Connections below the minimum strength are ignored.
///
/// Returns the number of edges reinforced.
pub fn apply_connections(
    graph: &mut ConceptGraph,
    new_node: &str,
    connections: &[Connection],
    now: Timestamp,
) -> usize {
    let Some(source) = graph
        .upsert_concept_at(new_node, ConceptOptions::default(), now)
        .map(|c| c.id.clone())
    else {
        return 0;
    };

    let mut folded = 0;
    for connection in connections {
        if !connection.strength.is_finite() || connection.strength < MIN_CONNECTION_STRENGTH {
            continue;
        }
        let Some(target) = graph
            .upsert_concept_at(&connection.node, ConceptOptions::default(), now)
            .map(|c| c.id.clone())
        else {
            continue;
        };
        if graph
            .upsert_edge(source.as_str(), target.as_str(), connection.strength, SourceKind::Sim, now)
            .is_some()
        {
            folded += 1;
        }
    }
    folded
}
