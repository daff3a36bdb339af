//! External text-transformation service (the AI model)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single transformer call
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub type TransformResult<T> = std::result::Result<T, TransformerError>;

#[derive(Error, Debug)]
pub enum TransformerError {
    #[error("transformer is not configured: {0}")]
    NotConfigured(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no text")]
    EmptyResponse,
}

/// One synchronous request to the transformer
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub prompt: String,
    pub temperature: f32,
}

impl TransformRequest {
    /// A request at the most deterministic temperature
    pub fn deterministic(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
        }
    }
}

/// A text-in, text-out capability. The returned text is untrusted.
pub trait Transformer: Send + Sync {
    fn transform(&self, request: &TransformRequest) -> TransformResult<String>;

    /// Short name for log lines
    fn name(&self) -> &str {
        "transformer"
    }
}

/// Connection settings for [`GeminiTransformer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` over blocking HTTP
#[derive(Debug, Clone)]
pub struct GeminiTransformer {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
}

impl GeminiTransformer {
    pub fn new(config: GeminiConfig) -> TransformResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(TransformerError::NotConfigured(
                "API key is empty".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransformerError::Http(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl Transformer for GeminiTransformer {
    fn transform(&self, request: &TransformRequest) -> TransformResult<String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
            },
        };

        log::debug!(
            "Sending {} prompt characters to {}",
            request.prompt.chars().count(),
            self.endpoint()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransformerError::Timeout(self.config.timeout_secs)
                } else {
                    TransformerError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransformerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .map_err(|e| TransformerError::Http(e.to_string()))?;

        extract_text(parsed)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

fn extract_text(response: GeminiResponse) -> TransformResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(TransformerError::EmptyResponse)
    } else {
        Ok(text)
    }
}
