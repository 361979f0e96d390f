use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{CompletionRequest, LlmClient, LlmClientError};
use crate::config::Config;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection details for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ProviderSettings {
    /// API root, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.llm_base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
        }
    }
}

/// Chat completions client shared by every request for the lifetime of the process.
pub struct OpenAiCompatibleClient {
    http: Client,
    settings: ProviderSettings,
}

impl OpenAiCompatibleClient {
    /// Build the HTTP transport for the given provider.
    pub fn new(settings: ProviderSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("ledgerlens/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        tracing::debug!(
            base_url = %settings.base_url,
            model = %settings.model,
            "Initialized LLM provider client"
        );
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmClientError> {
        let payload = json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmClientError::Transient(format!(
                    "failed to reach provider at {}: {error}",
                    self.settings.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::Auth(format!("provider returned {status}: {body}")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::Transient(format!(
                "provider returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::InvalidResponse(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            LlmClientError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                LlmClientError::InvalidResponse("completion contained no message content".into())
            })
    }
}
