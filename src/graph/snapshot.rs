//! Plain snapshot of the registry contents

use super::concept::Concept;
use super::edge::Edge;
use super::segment::Segment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{exportedAt, segments, nodes, edges}`: no schema versioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub nodes: Vec<Concept>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
