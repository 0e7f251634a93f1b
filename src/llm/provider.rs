//! The completion provider boundary and its OpenAI/LiteLLM-compatible
//! implementation, grounded on the teacher's `llm::litellm::LiteLlmClient`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A source of candidate completions for an assembled prompt text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request completions for `prompt` at `temperature`. The returned set
    /// is deduplicated by content; the engine treats completion identity as
    /// the string itself.
    async fn completions(&self, prompt: &str, temperature: f64) -> Result<HashSet<String>, LlmError>;
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 1],
    temperature: f64,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// An HTTP client against an OpenAI/LiteLLM-style `/chat/completions`
/// endpoint, requesting `n` completions per call at the given temperature.
pub struct OpenAiCompatibleProvider {
    api_base: String,
    api_key: Option<String>,
    model: String,
    n: u32,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_base: String, api_key: Option<String>, model: String, n: u32) -> Self {
        Self {
            api_base,
            api_key,
            model,
            n,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Build a provider from `GENFORGE_API_BASE` / `GENFORGE_API_KEY` /
    /// `GENFORGE_MODEL` environment variables.
    pub fn from_env(n: u32) -> Result<Self, LlmError> {
        let api_base = std::env::var("GENFORGE_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = std::env::var("GENFORGE_API_KEY").ok();
        let model = std::env::var("GENFORGE_MODEL").unwrap_or_else(|_| "gpt-4".to_string());
        Ok(Self::new(api_base, api_key, model, n))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn completions(&self, prompt: &str, temperature: f64) -> Result<HashSet<String>, LlmError> {
        let request = ApiRequest {
            model: &self.model,
            messages: [ApiMessage { role: "user", content: prompt }],
            temperature,
            n: self.n,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {key}"));
        }

        let response = http_request
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());

            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&text) {
                if code == 429 {
                    return Err(LlmError::RateLimited(parsed.error.message));
                }
                return Err(LlmError::ApiError { code, message: parsed.error.message });
            }
            return Err(LlmError::ApiError { code, message: text });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        Ok(parsed.choices.into_iter().map(|c| c.message.content).collect())
    }
}
