//! Undirected edges with provenance-tracked weight

use super::concept::{ConceptId, Timestamp, PAIR_SEPARATOR};
use serde::{Deserialize, Serialize};

/// Unique identifier for an edge: the canonical pair key `a|b` with `a < b`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Build the canonical id for an ordered endpoint pair
    fn for_pair(first: &ConceptId, second: &ConceptId) -> Self {
        Self(format!("{}{}{}", first, PAIR_SEPARATOR, second))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order two endpoints lexicographically so `(a, b)` and `(b, a)` collide.
pub fn canonical_pair(a: &str, b: &str) -> (ConceptId, ConceptId) {
    if a <= b {
        (ConceptId::from_string(a), ConceptId::from_string(b))
    } else {
        (ConceptId::from_string(b), ConceptId::from_string(a))
    }
}

/// Where a piece of edge weight came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Tokens appearing near each other in a segment
    Cooccur,
    /// Relationship returned by the enrichment service
    Ai,
    /// Similarity connection from the enrichment service
    Sim,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooccur => "cooccur",
            Self::Ai => "ai",
            Self::Sim => "sim",
        }
    }
}

/// Accumulated (never decayed) contribution per source kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub cooccur: f64,
    #[serde(default)]
    pub ai: f64,
    #[serde(default)]
    pub sim: f64,
}

impl Provenance {
    pub fn add(&mut self, kind: SourceKind, delta: f64) {
        match kind {
            SourceKind::Cooccur => self.cooccur += delta,
            SourceKind::Ai => self.ai += delta,
            SourceKind::Sim => self.sim += delta,
        }
    }

    pub fn get(&self, kind: SourceKind) -> f64 {
        match kind {
            SourceKind::Cooccur => self.cooccur,
            SourceKind::Ai => self.ai,
            SourceKind::Sim => self.sim,
        }
    }

    /// Component-wise sum, used when two edges collapse into one
    pub fn absorb(&mut self, other: &Provenance) {
        self.cooccur += other.cooccur;
        self.ai += other.ai;
        self.sim += other.sim;
    }

    pub fn total(&self) -> f64 {
        self.cooccur + self.ai + self.sim
    }
}

/// An undirected weighted relation between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Lexicographically smaller endpoint
    pub source: ConceptId,
    /// Lexicographically larger endpoint
    pub target: ConceptId,
    pub weight: f64,
    pub last_seen_at: Timestamp,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub pruned: bool,
}

impl Edge {
    /// Create a zero-weight edge; endpoints are reordered canonically.
    pub fn new(a: &str, b: &str, now: Timestamp) -> Self {
        let (source, target) = canonical_pair(a, b);
        Self {
            id: EdgeId::for_pair(&source, &target),
            source,
            target,
            weight: 0.0,
            last_seen_at: now,
            provenance: Provenance::default(),
            pruned: false,
        }
    }

    /// Add a contribution from `kind`
    pub fn reinforce(&mut self, delta: f64, kind: SourceKind, now: Timestamp) {
        self.weight += delta;
        self.provenance.add(kind, delta);
        self.last_seen_at = now;
    }

    pub fn key(&self) -> (ConceptId, ConceptId) {
        (self.source.clone(), self.target.clone())
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source.as_str() == id || self.target.as_str() == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_canonically_ordered() {
        let ab = Edge::new("beta", "alpha", 0);
        let ba = Edge::new("alpha", "beta", 0);
        assert_eq!(ab.id, ba.id);
        assert_eq!(ab.id.as_str(), "alpha|beta");
        assert_eq!(ab.source.as_str(), "alpha");
        assert_eq!(ab.target.as_str(), "beta");
    }

    #[test]
    fn reinforce_tracks_provenance_per_kind() {
        let mut edge = Edge::new("a", "b", 0);
        edge.reinforce(1.5, SourceKind::Cooccur, 10);
        edge.reinforce(2.0, SourceKind::Ai, 20);
        edge.reinforce(0.5, SourceKind::Cooccur, 30);

        assert_eq!(edge.weight, 4.0);
        assert_eq!(edge.provenance.get(SourceKind::Cooccur), 2.0);
        assert_eq!(edge.provenance.get(SourceKind::Ai), 2.0);
        assert_eq!(edge.provenance.get(SourceKind::Sim), 0.0);
        assert_eq!(edge.provenance.total(), edge.weight);
        assert_eq!(edge.last_seen_at, 30);
    }

    #[test]
    fn absorb_adds_component_wise() {
        let mut left = Provenance { cooccur: 1.0, ai: 2.0, sim: 0.0 };
        let right = Provenance { cooccur: 0.5, ai: 0.0, sim: 3.0 };
        left.absorb(&right);
        assert_eq!(left, Provenance { cooccur: 1.5, ai: 2.0, sim: 3.0 });
    }
}
