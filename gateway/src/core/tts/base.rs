//! Base trait and types for streaming speech synthesis providers.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Raw audio as delivered by the vendor, in arbitrarily sized chunks.
pub type AudioChunkStream = BoxStream<'static, TTSResult<Bytes>>;

/// Text to be spoken, one chunk per synthesis request.
pub type TextStream = BoxStream<'static, String>;

#[derive(Debug, Clone)]
pub struct TTSConfig {
    pub provider: String,
    pub api_key: String,
    pub voice_id: Option<String>,
    pub model: String,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Vendor output format identifier
    pub audio_format: Option<String>,
    /// Override of the vendor endpoint (tests, proxies)
    pub base_url: Option<String>,
    /// Account identifier for vendors that authenticate with two headers
    pub user_id: Option<String>,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            voice_id: None,
            model: String::new(),
            sample_rate: 16000,
            audio_format: None,
            base_url: None,
            user_id: None,
        }
    }
}

/// A speech synthesis session.
///
/// One instance serves one turn: `connect`, then a single `synthesize`, then `close`.
#[async_trait]
pub trait BaseTTS: Send {
    /// Opens the vendor session.
    async fn connect(&mut self) -> TTSResult<()>;

    /// Starts synthesizing `text` and returns the audio as it arrives.
    ///
    /// The returned stream does not borrow the provider; audio keeps flowing until the
    /// text ends and the vendor has flushed, or until [`close`](Self::close).
    fn synthesize(&mut self, text: TextStream) -> TTSResult<AudioChunkStream>;

    /// Releases the vendor session. Safe to call more than once.
    fn close(&mut self);

    /// Number of leading audio chunks that carry a container header instead of samples.
    fn preamble_chunks(&self) -> usize {
        0
    }

    fn provider_name(&self) -> &'static str;
}

pub type BoxedTTS = Box<dyn BaseTTS>;

/// Builds a fresh synthesis session for every turn.
pub type TTSFactory = Arc<dyn Fn() -> TTSResult<BoxedTTS> + Send + Sync>;
