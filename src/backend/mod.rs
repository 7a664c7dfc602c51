//! Generation backends.
//!
//! The engine only sees [`GenerationBackend`]: a prompt goes in, text or a
//! [`GenerationError`] comes out. Two HTTP implementations ship with the
//! crate; tests substitute their own.

mod deepseek;
mod gemini;

pub use deepseek::DeepSeekBackend;
pub use gemini::GeminiBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{GenerationError, ValidationError};
use crate::novel_config::NovelToml;

/// Supported generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Deepseek,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Deepseek => "deepseek",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Deepseek => "DEEPSEEK_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "deepseek" => Ok(Provider::Deepseek),
            other => Err(ValidationError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A text generation service.
///
/// Implementations must be usable behind `Arc<dyn GenerationBackend>`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, config: &ModelConfig) -> Result<String, GenerationError>;
}

/// Build the configured backend.
///
/// Fails with [`ValidationError::MissingApiKey`] when the selected provider
/// has no key after all configuration layers are applied.
pub fn build_backend(config: &NovelToml) -> Result<Arc<dyn GenerationBackend>, ValidationError> {
    let provider = config.generation.provider;
    let api_key = config
        .api_key(provider)
        .ok_or_else(|| ValidationError::MissingApiKey {
            provider: provider.to_string(),
            env_var: provider.api_key_env().to_string(),
        })?;
    let timeout = Duration::from_secs(config.generation.request_timeout_secs);

    let backend: Arc<dyn GenerationBackend> = match provider {
        Provider::Gemini => Arc::new(GeminiBackend::new(
            api_key,
            config.gemini.endpoint.clone(),
            timeout,
        )),
        Provider::Deepseek => Arc::new(DeepSeekBackend::new(
            api_key,
            config.deepseek.endpoint.clone(),
            timeout,
        )),
    };
    Ok(backend)
}

/// Build the HTTP client shared by both providers.
fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Human-readable reason for a non-success response.
///
/// Prefers the API's `error.message`, falling back to the HTTP status.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
