//! Configuration loaded from YAML
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use crate::enrichment::EnrichmentConfig;
use crate::ingest::IngestConfig;
use crate::scoring::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindmapConfig {
    pub scoring: ScoringConfig,
    pub ingest: IngestConfig,
    pub enrichment: EnrichmentConfig,
    /// Interval between decay/prune ticks
    pub tick_ms: u64,
    pub log_level: String,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            ingest: IngestConfig::default(),
            enrichment: EnrichmentConfig::default(),
            tick_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl MindmapConfig {
    /// Default location (~/.local/share/mindmap/config.yaml on Linux)
    pub fn default_path() -> PathBuf {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
        data_dir.join("mindmap").join("config.yaml")
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Load `path` if given, else the default path if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let scoring = &self.scoring;
        if !scoring.decay_factor.is_finite() || scoring.decay_factor <= 0.0 || scoring.decay_factor >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scoring.decay_factor must be in (0, 1), got {}",
                scoring.decay_factor
            )));
        }
        if scoring.node_threshold < 0.0 || scoring.edge_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "scoring thresholds must not be negative".to_string(),
            ));
        }
        if scoring.max_nodes == 0 {
            return Err(ConfigError::Invalid("scoring.max_nodes must be positive".to_string()));
        }
        if self.ingest.dedup_window_ms < 0 {
            return Err(ConfigError::Invalid(
                "ingest.dedup_window_ms must not be negative".to_string(),
            ));
        }
        if self.enrichment.guard_window_ms < 0 {
            return Err(ConfigError::Invalid(
                "enrichment.guard_window_ms must not be negative".to_string(),
            ));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".to_string()));
        }
        Ok(())
    }
}
