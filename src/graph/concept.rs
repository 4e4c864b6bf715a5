//! Concept representation in the relevance graph

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Separator between the two endpoints of an edge id; never part of a concept key.
pub const PAIR_SEPARATOR: char = '|';

/// Normalize a label into a concept key: lowercase, surrounding whitespace
/// trimmed, pair separators replaced by spaces.
pub fn normalize_key(label: &str) -> String {
    label.replace(PAIR_SEPARATOR, " ").trim().to_lowercase()
}

/// Unique identifier for a concept
///
/// Serializes as a plain string. Always holds a normalized key when built
/// through [`ConceptId::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    /// Derive the id for a label (lowercase + trim)
    pub fn normalized(label: &str) -> Self {
        Self(normalize_key(label))
    }

    /// Wrap an already-normalized key without touching it
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for ConceptId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concept type classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptType {
    #[default]
    Topic,
    Entity,
    Other,
}

impl ConceptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Entity => "entity",
            Self::Other => "other",
        }
    }
}

/// Options for [`ConceptGraph::upsert_concept`](super::ConceptGraph::upsert_concept)
#[derive(Debug, Clone, Default)]
pub struct ConceptOptions {
    pub concept_type: ConceptType,
    /// Extra aliases registered on creation (lowercased)
    pub aliases: Vec<String>,
}

impl ConceptOptions {
    pub fn typed(concept_type: ConceptType) -> Self {
        Self {
            concept_type,
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// A node in the relevance graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    /// Display form of the first-seen label
    pub canonical_label: String,
    pub aliases: BTreeSet<String>,
    #[serde(rename = "type", default)]
    pub concept_type: ConceptType,
    pub weight: f64,
    pub last_seen_at: Timestamp,
    #[serde(default)]
    pub pruned: bool,
}

impl Concept {
    /// Create a zero-weight concept for `label`
    pub fn new(label: &str, options: &ConceptOptions, now: Timestamp) -> Self {
        let id = ConceptId::normalized(label);
        let mut aliases = BTreeSet::new();
        aliases.insert(id.as_str().to_string());
        for alias in &options.aliases {
            let alias = normalize_key(alias);
            if !alias.is_empty() {
                aliases.insert(alias);
            }
        }
        Self {
            id,
            canonical_label: label.trim().to_string(),
            aliases,
            concept_type: options.concept_type,
            weight: 0.0,
            last_seen_at: now,
            pruned: false,
        }
    }
}
