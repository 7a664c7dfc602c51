use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GenerationBackend, ModelConfig, api_error_message, http_client};
use crate::errors::GenerationError;

const PROVIDER: &str = "deepseek";
const SYSTEM_MESSAGE: &str = "You are a professional novel-writing assistant.";

/// Client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct DeepSeekBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DeepSeekBackend {
    pub fn new(api_key: String, endpoint: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

fn request_body<'a>(prompt: &'a str, config: &'a ModelConfig) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_MESSAGE,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: config.temperature,
        max_tokens: config.max_output_tokens,
    }
}

fn extract_text(response: ChatResponse) -> Option<String> {
    response.choices.into_iter().next()?.message?.content
}

#[async_trait]
impl GenerationBackend for DeepSeekBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, config: &ModelConfig) -> Result<String, GenerationError> {
        debug!(model = %config.model, prompt_chars = prompt.chars().count(), "Sending DeepSeek request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
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
            warn!(status = status.as_u16(), %message, "DeepSeek API error");
            return Err(GenerationError::Api {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|_| GenerationError::InvalidResponse {
                provider: PROVIDER.to_string(),
            })?;

        extract_text(parsed).ok_or_else(|| GenerationError::InvalidResponse {
            provider: PROVIDER.to_string(),
        })
    }
}
