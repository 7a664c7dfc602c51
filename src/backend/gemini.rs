use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GenerationBackend, ModelConfig, api_error_message, http_client};
use crate::errors::GenerationError;

const PROVIDER: &str = "gemini";

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(api_key: String, endpoint: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

fn request_body<'a>(prompt: &'a str, config: &ModelConfig) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            top_k: 40,
            top_p: 0.95,
        },
    }
}

/// Text of the first part of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, config: &ModelConfig) -> Result<String, GenerationError> {
        debug!(model = %config.model, prompt_chars = prompt.chars().count(), "Sending Gemini request");

        let response = self
            .client
            .post(self.url(&config.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(prompt, config))
            .send()
            .await
            .map_err(|e| GenerationError::Transport {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| GenerationError::Transport {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            let message = api_error_message(status, &body);
            warn!(status = status.as_u16(), %message, "Gemini API error");
            return Err(GenerationError::Api {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|_| GenerationError::InvalidResponse {
                provider: PROVIDER.to_string(),
            })?;

        extract_text(parsed).ok_or_else(|| GenerationError::InvalidResponse {
            provider: PROVIDER.to_string(),
        })
    }
}
