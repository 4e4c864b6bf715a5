//! Enrichment: rate-limited calls to an external analysis service
//!
//! Recent segment text is sent to an [`EnrichmentService`] at most once at a
//! time and not more often than the cool-down allows. Returned concepts and
//! relationships are folded back into the registry with `ai` provenance and
//! a boosted weight.

mod adapter;
mod admission;
mod command;
mod fold;
mod response;
mod service;

pub use adapter::{AnalysisOutcome, EnrichmentAdapter};
pub use admission::{
    AdmissionGuard, AdmissionPhase, PendingPermit, DEFAULT_GUARD_WINDOW_MS, DEFAULT_MIN_TEXT_LEN,
};
pub use command::{CommandConfig, CommandService};
pub use fold::{
    apply_analysis, apply_analysis_with, apply_connections, normalize_strength, FoldOptions,
    FoldReport, AI_BOOST, MAX_STRENGTH,
};
pub use response::{analysis_from_value, parse_analysis, AliasHint, Analysis, RelationshipHint};
pub use service::{
    BatchRequest, Connection, EnrichmentError, EnrichmentResult, EnrichmentService, MockService,
    DEFAULT_MODEL, MIN_CONNECTION_STRENGTH, MIN_THEME_SENTENCE_LEN,
};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Enrichment parameters as they appear in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub model: String,
    pub min_text_len: usize,
    pub guard_window_ms: i64,
    pub ai_boost: f64,
    pub max_strength: f64,
    pub timeout_ms: u64,
    /// External command used by the CLI; enrichment is skipped without one
    pub command: Option<CommandConfig>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            guard_window_ms: DEFAULT_GUARD_WINDOW_MS,
            ai_boost: AI_BOOST,
            max_strength: MAX_STRENGTH,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            command: None,
        }
    }
}
