//! Base trait and types for streaming text generation providers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

pub type LLMResult<T> = Result<T, LLMError>;

/// Live sequence of generated text fragments.
pub type FragmentStream = BoxStream<'static, LLMResult<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Override of the vendor endpoint (tests, proxies)
    pub base_url: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: None,
            max_tokens: None,
            base_url: None,
        }
    }
}

/// A chat model that streams its answer.
#[async_trait]
pub trait BaseLLM: Send + Sync {
    /// Sends the conversation and returns the answer as it is generated.
    ///
    /// Errors before the first fragment are returned directly; errors after that
    /// arrive inside the stream, which ends right after yielding one.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> LLMResult<FragmentStream>;

    fn provider_name(&self) -> &'static str;
}

pub type SharedLLM = Arc<dyn BaseLLM>;
