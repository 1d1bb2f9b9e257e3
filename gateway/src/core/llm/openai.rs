//! OpenAI Chat Completions with server-sent event streaming.
//!
//! `POST https://api.openai.com/v1/chat/completions` with `"stream": true` answers with
//! `data: {chunk}` lines terminated by `data: [DONE]`. Network chunks do not respect
//! line boundaries, so [`SseDecoder`] buffers bytes until a full line is available.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::base::{BaseLLM, ChatMessage, FragmentStream, LLMConfig, LLMError, LLMResult};

/// Chat Completions endpoint.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

// =============================================================================
// SSE Decoding
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseData {
    Delta(String),
    Done,
}

/// Line-buffering decoder for the completion event stream.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Consumes a network chunk and returns the payloads of every line it completed.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<LLMResult<SseData>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(item) = Self::parse_line(line.trim_end_matches(['\r', '\n'])) {
                out.push(item);
            }
        }
        out
    }

    fn parse_line(line: &str) -> Option<LLMResult<SseData>> {
        let payload = line.strip_prefix("data:")?.trim_start();
        if payload == "[DONE]" {
            return Some(Ok(SseData::Done));
        }

        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(payload) {
            return Some(Err(LLMError::ProviderError(envelope.error.message)));
        }

        if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(payload) {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())?;
            return Some(Ok(SseData::Delta(content)));
        }

        Some(Err(LLMError::InvalidResponse(format!(
            "Unparseable completion chunk: {payload}"
        ))))
    }
}

// =============================================================================
// OpenAIChat
// =============================================================================

pub struct OpenAIChat {
    client: reqwest::Client,
    config: LLMConfig,
    url: String,
}

impl OpenAIChat {
    pub fn new(config: LLMConfig) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::AuthenticationFailed(
                "API key is required for OpenAI chat".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LLMError::ConfigurationError(format!("Failed to build HTTP client: {e}")))?;
        let url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_CHAT_URL.to_string());

        Ok(Self {
            client,
            config,
            url,
        })
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl BaseLLM for OpenAIChat {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> LLMResult<FragmentStream> {
        let body = self.build_request_body(&messages);
        debug!(model = %self.config.model, messages = messages.len(), "Requesting completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(detail),
                429 => LLMError::RateLimitExceeded(detail),
                _ => LLMError::ProviderError(format!("API error {status}: {detail}")),
            });
        }

        info!(model = %self.config.model, "Completion stream opened");
        let mut bytes = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut decoder = SseDecoder::default();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LLMError::ConnectionFailed(format!("Stream error: {e}")));
                        break;
                    }
                };
                for item in decoder.feed(&chunk) {
                    match item {
                        Ok(SseData::Delta(text)) => yield Ok(text),
                        Ok(SseData::Done) => break 'read,
                        Err(e) => {
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }
        }))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
