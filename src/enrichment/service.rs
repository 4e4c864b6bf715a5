//! Enrichment service trait and the in-process mock
//!
//! The service is whatever turns recent transcript text into concepts and
//! relationships (typically an LLM behind some transport). The adapter only
//! depends on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Minimum trimmed sentence length for theme extraction.
pub const MIN_THEME_SENTENCE_LEN: usize = 10;

/// Connections weaker than this are discarded.
pub const MIN_CONNECTION_STRENGTH: f64 = 0.3;

/// Errors from enrichment service operations.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment service not available: {0}")]
    Unavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invocation failed: {0}")]
    InvocationFailed(String),
    #[error("enrichment call timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EnrichmentResult<T> = Result<T, EnrichmentError>;

/// Body of a bulk analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub transcripts: String,
    pub model: String,
}

impl BatchRequest {
    pub fn new(transcripts: impl Into<String>) -> Self {
        Self {
            transcripts: transcripts.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// A similarity link suggested for a newly seen concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub node: String,
    pub strength: f64,
    #[serde(default)]
    pub reason: String,
}

/// Transport-independent enrichment calls.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// A short theme label for `sentence`, given the concepts already known.
    async fn extract_theme(
        &self,
        sentence: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<String>;

    /// Existing concepts related to `new_node`.
    async fn find_connections(
        &self,
        new_node: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<Vec<Connection>>;

    /// Raw response text for a transcript batch; parsed by the caller.
    async fn bulk_analyze(&self, request: &BatchRequest) -> EnrichmentResult<String>;
}

/// Mock service for testing — returns preconfigured responses.
///
/// Queued analysis responses are served in order; the last one repeats.
#[derive(Debug)]
pub struct MockService {
    available: bool,
    analyses: Mutex<VecDeque<Result<String, String>>>,
    theme: Option<String>,
    connections: Vec<Connection>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockService {
    /// Create a mock service that answers calls.
    pub fn available() -> Self {
        Self {
            available: true,
            analyses: Mutex::new(VecDeque::new()),
            theme: None,
            connections: Vec::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock service that fails every call with `Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Queue a raw `bulk_analyze` response.
    pub fn with_analysis(self, response: impl Into<String>) -> Self {
        self.queue(Ok(response.into()))
    }

    /// Queue a `bulk_analyze` failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.queue(Err(message.into()))
    }

    fn queue(mut self, entry: Result<String, String>) -> Self {
        self.analyses
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(entry);
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received across all operations.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> EnrichmentResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(EnrichmentError::Unavailable(
                "mock service configured as unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn next_analysis(&self) -> Option<Result<String, String>> {
        let mut analyses = self.analyses.lock().ok()?;
        if analyses.len() > 1 {
            analyses.pop_front()
        } else {
            analyses.front().cloned()
        }
    }
}

#[async_trait]
impl EnrichmentService for MockService {
    async fn extract_theme(
        &self,
        sentence: &str,
        _existing_nodes: &[String],
    ) -> EnrichmentResult<String> {
        self.enter().await?;
        if sentence.trim().chars().count() < MIN_THEME_SENTENCE_LEN {
            return Err(EnrichmentError::InvalidInput("sentence too short".to_string()));
        }
        self.theme
            .clone()
            .ok_or_else(|| EnrichmentError::InvocationFailed("no mock theme configured".to_string()))
    }

    async fn find_connections(
        &self,
        _new_node: &str,
        existing_nodes: &[String],
    ) -> EnrichmentResult<Vec<Connection>> {
        self.enter().await?;
        if existing_nodes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.connections.clone())
    }

    async fn bulk_analyze(&self, request: &BatchRequest) -> EnrichmentResult<String> {
        self.enter().await?;
        if request.transcripts.chars().count() < super::DEFAULT_MIN_TEXT_LEN {
            return Err(EnrichmentError::InvalidInput("transcript too short".to_string()));
        }
        match self.next_analysis() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(EnrichmentError::InvocationFailed(message)),
            None => Err(EnrichmentError::InvocationFailed(
                "no mock analysis configured".to_string(),
            )),
        }
    }
}
