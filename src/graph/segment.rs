//! Segments: the immutable, append-only log of ingested text

use super::concept::Timestamp;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Sequence identifier `seg-<n>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    pub(crate) fn from_sequence(n: u64) -> Self {
        Self(format!("seg-{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric sequence, if the id has the `seg-<n>` shape
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix("seg-").and_then(|n| n.parse().ok())
    }
}

impl Borrow<str> for SegmentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A segment before the registry assigns its id
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub text: String,
    pub tokens: Vec<String>,
    pub created_at: Timestamp,
}

impl NewSegment {
    pub fn new(text: impl Into<String>, tokens: Vec<String>, created_at: Timestamp) -> Self {
        Self {
            text: text.into(),
            tokens,
            created_at,
        }
    }
}

/// One unit of ingested text with its derived tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    /// Insertion order preserved
    pub tokens: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
}

impl Segment {
    /// Fuzzy match against a concept id: equal, substring-of, or containing
    pub fn mentions(&self, concept_id: &str) -> bool {
        let needle = concept_id.to_lowercase();
        self.tokens.iter().any(|token| {
            let token = token.to_lowercase();
            token == needle || needle.contains(&token) || token.contains(&needle)
        })
    }
}
