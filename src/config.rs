//! Workspace configuration with environment overrides

use crate::error::{Result, TabdeltaError};
use crate::normalize::DEFAULT_NORMALIZATION_BATCH_SIZE;
use crate::pipeline::PipelineSettings;
use crate::transformer::{
    GeminiConfig, GeminiTransformer, Transformer, DEFAULT_GEMINI_BASE_URL, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "TABDELTA_MODEL";
pub const ENV_TIMEOUT: &str = "TABDELTA_TRANSFORMER_TIMEOUT_SECS";
pub const ENV_BATCH_SIZE: &str = "TABDELTA_BATCH_SIZE";
pub const ENV_BASE_URL: &str = "TABDELTA_GEMINI_BASE_URL";

/// Contents of `.tabdelta/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_timeout")]
    pub transformer_timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub normalization_batch_size: usize,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_version() -> String {
    crate::FORMAT_VERSION.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_batch_size() -> usize {
    DEFAULT_NORMALIZATION_BATCH_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            created: Some(Utc::now()),
            model: default_model(),
            gemini_base_url: default_base_url(),
            transformer_timeout_secs: default_timeout(),
            normalization_batch_size: default_batch_size(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Read a config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TabdeltaError::config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Reject zero timeouts and batch sizes read from a file
    fn validate(&self, path: &Path) -> Result<()> {
        if self.transformer_timeout_secs == 0 {
            return Err(TabdeltaError::config(format!(
                "Invalid config file {}: transformer_timeout_secs must be a positive integer",
                path.display()
            )));
        }
        if self.normalization_batch_size == 0 {
            return Err(TabdeltaError::config(format!(
                "Invalid config file {}: normalization_batch_size must be a positive integer",
                path.display()
            )));
        }
        Ok(())
    }

    /// Config file plus process environment
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model = model;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.gemini_base_url = url;
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            self.transformer_timeout_secs = parse_positive(ENV_TIMEOUT, &raw)? as u64;
        }
        if let Some(raw) = get(ENV_BATCH_SIZE) {
            self.normalization_batch_size = parse_positive(ENV_BATCH_SIZE, &raw)?;
        }

        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Build the transformer capability, if an API key is available
    pub fn build_transformer(&self) -> Result<Option<Arc<dyn Transformer>>> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        let gemini = GeminiTransformer::new(GeminiConfig {
            api_key: api_key.clone(),
            model: self.model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout_secs: self.transformer_timeout_secs,
        })?;
        Ok(Some(Arc::new(gemini)))
    }

    pub fn pipeline_settings(&self, show_progress: bool) -> PipelineSettings {
        PipelineSettings {
            normalization_batch_size: self.normalization_batch_size,
            show_progress,
        }
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(TabdeltaError::config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
