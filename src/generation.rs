//! Answer generation provider abstraction and implementations.
//!
//! Defines the [`GenerationProvider`] trait and concrete implementations:
//! - **[`DisabledGeneration`]** — returns errors; used when generation is not configured.
//! - **[`OpenAIChat`]** — calls an OpenAI-compatible chat completions API.
//!
//! The OpenAI provider shares the embedding client's retry strategy: HTTP 429
//! and 5xx retry with exponential backoff, other 4xx fail immediately, and
//! exhausted retries surface as [`PipelineError::Generation`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::error::{PipelineError, Result};
use crate::models::ChatMessage;

/// Produces an answer from an ordered chat transcript.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for the given messages.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ============ Disabled Provider ============

/// A no-op generation provider that always returns errors.
///
/// Used when `generation.provider = "disabled"` in the configuration.
pub struct DisabledGeneration;

#[async_trait]
impl GenerationProvider for DisabledGeneration {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(PipelineError::Generation(
            "generation provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Chat completion provider using an OpenAI-compatible API.
///
/// Calls `POST {base_url}/v1/chat/completions` with the configured model.
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIChat {
    model: String,
    base_url: String,
    api_key: String,
    max_tokens: usize,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAIChat {
    /// Create a new OpenAI chat provider from configuration.
    ///
    /// Fails with [`PipelineError::Config`] if `model` is not set or if
    /// `OPENAI_API_KEY` is missing from the environment.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            PipelineError::Config("generation.model required for the openai provider".to_string())
        })?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PipelineError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatCompletionResponse =
                            response.json().await.map_err(|e| {
                                PipelineError::Generation(format!("invalid response body: {}", e))
                            })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|choice| choice.message.content)
                            .ok_or_else(|| {
                                PipelineError::Generation("no choices returned".to_string())
                            });
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(format!("API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(PipelineError::Generation(format!(
                        "API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(PipelineError::Generation(last_err.unwrap_or_else(|| {
            "generation failed after retries".to_string()
        })))
    }
}

/// Create the [`GenerationProvider`] selected by the configuration.
///
/// | Config value | Provider |
/// |--------------|----------|
/// | `"disabled"` | [`DisabledGeneration`] |
/// | `"openai"`   | [`OpenAIChat`] |
pub fn create_generation(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGeneration)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        other => Err(PipelineError::Config(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}
