//! EnrichmentAdapter: admission, outbound call, parse, fold

use super::admission::AdmissionGuard;
use super::fold::{apply_analysis_with, apply_connections, FoldOptions, FoldReport};
use super::response::{parse_analysis, Analysis};
use super::service::{
    BatchRequest, Connection, EnrichmentError, EnrichmentResult, EnrichmentService,
    MIN_CONNECTION_STRENGTH, MIN_THEME_SENTENCE_LEN,
};
use super::EnrichmentConfig;
use crate::graph::{now_ms, SharedGraph};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of an admitted, successful bulk analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analysis: Analysis,
    pub report: FoldReport,
}

/// Drives the external enrichment service on behalf of a live graph.
///
/// The graph lock is only taken for the fold, never across the outbound call.
pub struct EnrichmentAdapter {
    service: Arc<dyn EnrichmentService>,
    guard: AdmissionGuard,
    config: EnrichmentConfig,
}

impl EnrichmentAdapter {
    pub fn new(service: Arc<dyn EnrichmentService>, config: EnrichmentConfig) -> Self {
        let guard = AdmissionGuard::new(config.min_text_len, config.guard_window_ms);
        Self {
            service,
            guard,
            config,
        }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    pub fn guard(&self) -> &AdmissionGuard {
        &self.guard
    }

    pub fn build_batch_payload(&self, transcripts: &str) -> BatchRequest {
        BatchRequest::new(transcripts).with_model(self.config.model.clone())
    }

    pub fn ai_boost_multiplier(&self) -> f64 {
        self.config.ai_boost
    }

    pub fn is_pending(&self) -> bool {
        self.guard.is_pending()
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    fn fold_options(&self) -> FoldOptions {
        FoldOptions {
            ai_boost: self.config.ai_boost,
            max_strength: self.config.max_strength,
        }
    }

    /// Run one bulk analysis over `recent_text` if admitted.
    ///
    /// `Ok(None)` means the call was not admitted (disabled, in flight,
    /// cooling down or too little text). Failures and timeouts release the
    /// slot without starting a cool-down.
    pub async fn analyze(
        &self,
        graph: &SharedGraph,
        recent_text: &str,
    ) -> EnrichmentResult<Option<AnalysisOutcome>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(permit) = self.guard.try_admit(recent_text, now_ms()) else {
            return Ok(None);
        };

        let request = self.build_batch_payload(recent_text);
        info!(
            chars = recent_text.chars().count(),
            model = %request.model,
            "enrichment admitted"
        );

        let timeout = self.timeout();
        let raw = match tokio::time::timeout(timeout, self.service.bulk_analyze(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "enrichment call failed");
                return Err(e);
            }
            Err(_) => {
                warn!(timeout_ms = self.config.timeout_ms, "enrichment call timed out");
                return Err(EnrichmentError::Timeout(timeout));
            }
        };

        let analysis = parse_analysis(&raw);
        let now = now_ms();
        let options = self.fold_options();
        let report = graph.write(|g| apply_analysis_with(g, &analysis, &options, now));
        permit.complete(now);

        info!(
            concepts = report.concepts,
            relationships = report.relationships,
            aliases = report.aliases,
            "enrichment folded"
        );
        Ok(Some(AnalysisOutcome { analysis, report }))
    }

    /// Theme for a single sentence. Sentences shorter than ten characters
    /// (after trimming) are not sent.
    pub async fn theme_for(
        &self,
        sentence: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<Option<String>> {
        if sentence.trim().chars().count() < MIN_THEME_SENTENCE_LEN {
            return Ok(None);
        }
        let theme = tokio::time::timeout(
            self.timeout(),
            self.service.extract_theme(sentence.trim(), existing_nodes),
        )
        .await
        .map_err(|_| EnrichmentError::Timeout(self.timeout()))??;
        Ok(Some(theme))
    }

    /// Connections for `new_node` with strength of at least 0.3.
    pub async fn connections_for(
        &self,
        new_node: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<Vec<Connection>> {
        if existing_nodes.is_empty() {
            return Ok(Vec::new());
        }
        let connections = tokio::time::timeout(
            self.timeout(),
            self.service.find_connections(new_node, existing_nodes),
        )
        .await
        .map_err(|_| EnrichmentError::Timeout(self.timeout()))??;

        Ok(connections
            .into_iter()
            .filter(|c| c.strength >= MIN_CONNECTION_STRENGTH)
            .collect())
    }

    /// Look up connections for `new_node` among the current concepts and
    /// fold them as similarity edges. Returns the number of edges reinforced.
    pub async fn connect(&self, graph: &SharedGraph, new_node: &str) -> EnrichmentResult<usize> {
        let existing: Vec<String> = graph.read(|g| {
            g.concepts()
                .filter(|c| c.id.as_str() != new_node)
                .map(|c| c.id.to_string())
                .collect()
        });
        let connections = self.connections_for(new_node, &existing).await?;
        let now = now_ms();
        Ok(graph.write(|g| apply_connections(g, new_node, &connections, now)))
    }
}
