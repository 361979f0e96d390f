//! Abstractions over the external chat-completion provider.
//!
//! The dispatcher talks to the provider exclusively through [`LlmClient`], so the pipeline can
//! be exercised with scripted clients in tests. [`OpenAiCompatibleClient`] is the production
//! adapter for OpenAI-compatible endpoints such as Groq.

mod openai;

pub use openai::{OpenAiCompatibleClient, ProviderSettings};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the LLM provider.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// The provider rejected the configured credential. Never retried.
    #[error("Provider rejected credentials: {0}")]
    Auth(String),
    /// Rate limiting, server errors, or network failures that may clear on retry.
    #[error("Provider temporarily unavailable: {0}")]
    Transient(String),
    /// The call exceeded the configured time budget.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
    /// The provider answered with something that is not a usable completion.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl LlmClientError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// A single role invocation: system framing plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// System message describing persona and grounding rules.
    pub system: String,
    /// User message carrying goal, query, document, and threaded context.
    pub user: String,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the model's reply to `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(LlmClientError::Transient("429".into()).is_retryable());
        assert!(LlmClientError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!LlmClientError::Auth("401".into()).is_retryable());
        assert!(!LlmClientError::InvalidResponse("{}".into()).is_retryable());
    }
}
