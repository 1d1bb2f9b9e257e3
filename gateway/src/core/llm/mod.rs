pub mod base;
pub mod generator;
pub mod history;
pub mod openai;

use std::sync::Arc;

pub use base::{
    BaseLLM, ChatMessage, ChatRole, FragmentStream, LLMConfig, LLMError, LLMResult, SharedLLM,
};
pub use generator::{CONTEXT_PREFIX, DEFAULT_SYSTEM_PROMPT, GenerationDriver};
pub use history::{ConversationHistory, HistoryError, SharedHistory, Speaker, Turn};
pub use openai::{OPENAI_CHAT_URL, OpenAIChat};

/// Supported chat providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    OpenAI,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            _ => Err(LLMError::ConfigurationError(format!(
                "Unsupported LLM provider: {s}. Supported providers: openai"
            ))),
        }
    }
}

/// Factory function to create a chat provider
pub fn create_llm_provider(provider: &str, config: LLMConfig) -> LLMResult<SharedLLM> {
    let provider_enum: LLMProvider = provider.parse()?;
    match provider_enum {
        LLMProvider::OpenAI => Ok(Arc::new(OpenAIChat::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<LLMProvider>().unwrap(), LLMProvider::OpenAI);
        assert!("claude".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_create_provider() {
        let config = LLMConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        };
        let llm = create_llm_provider("openai", config).unwrap();
        assert_eq!(llm.provider_name(), "openai");
    }
}
