//! Base trait and types for streaming speech-to-text providers.
//!
//! Providers push typed [`TranscriptionEvent`]s into a bounded channel handed to
//! [`BaseSTT::connect`]. Every event carries the generation number of the vendor
//! session that produced it, so consumers can tell a fresh session from a stale one.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::StreamingAudioConfig;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("Not connected")]
    NotConnected,
}

pub type STTResult<T> = Result<T, STTError>;

// =============================================================================
// Configuration
// =============================================================================

/// Provider-agnostic transcription settings.
#[derive(Debug, Clone)]
pub struct STTConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: String,
    pub punctuation: bool,
    /// Ask for partial hypotheses as well as finals
    pub interim_results: bool,
    /// Silence (ms) after which the vendor reports an utterance end
    pub utterance_end_ms: u32,
    pub vad_events: bool,
    /// Override of the vendor endpoint (tests, regional hosts)
    pub base_url: Option<String>,
}

impl Default for STTConfig {
    fn default() -> Self {
        let audio = StreamingAudioConfig::default();
        Self {
            provider: "deepgram".to_string(),
            api_key: String::new(),
            model: "nova-2".to_string(),
            language: audio.language.clone(),
            sample_rate: audio.sample_rate(),
            channels: audio.channels(),
            encoding: audio.encoding().to_string(),
            punctuation: true,
            interim_results: true,
            utterance_end_ms: audio.utterance_end_ms,
            vad_events: true,
            base_url: None,
        }
    }
}

impl STTConfig {
    /// Settings matching a call's audio format.
    pub fn for_audio(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        audio: &StreamingAudioConfig,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: audio.language.clone(),
            sample_rate: audio.sample_rate(),
            channels: audio.channels(),
            encoding: audio.encoding().to_string(),
            utterance_end_ms: audio.utterance_end_ms,
            ..Default::default()
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Raw event kinds a transcription vendor can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionEventKind {
    /// Recognized text. `is_final` is false for interim hypotheses.
    Transcript { text: String, is_final: bool },
    /// Voice activity started
    SpeechStarted,
    /// Endpoint detected: the user stopped speaking
    UtteranceEnd,
    /// Vendor-reported problem that did not tear the session down
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionEvent {
    /// Vendor session that produced the event
    pub generation: u64,
    pub kind: TranscriptionEventKind,
}

impl TranscriptionEvent {
    pub fn transcript(generation: u64, text: impl Into<String>, is_final: bool) -> Self {
        Self {
            generation,
            kind: TranscriptionEventKind::Transcript {
                text: text.into(),
                is_final,
            },
        }
    }

    pub fn utterance_end(generation: u64) -> Self {
        Self {
            generation,
            kind: TranscriptionEventKind::UtteranceEnd,
        }
    }
}

/// Sender side of the transcription event channel.
pub type TranscriptionEventSender = mpsc::Sender<TranscriptionEvent>;

// =============================================================================
// BaseSTT Trait
// =============================================================================

/// A streaming transcription vendor session.
///
/// `connect` opens a brand-new vendor session; after `disconnect` the provider can be
/// connected again, and nothing from the previous session leaks into the next one.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Opens a vendor session whose events are stamped with `generation`.
    async fn connect(&mut self, generation: u64, events: TranscriptionEventSender)
    -> STTResult<()>;

    /// Closes the current vendor session, if any.
    async fn disconnect(&mut self) -> STTResult<()>;

    async fn send_audio(&mut self, audio: Bytes) -> STTResult<()>;

    fn is_ready(&self) -> bool;

    fn provider_name(&self) -> &'static str;
}

pub type BoxedSTT = Box<dyn BaseSTT>;

/// Builds a fresh provider per call.
pub type STTFactory = Arc<dyn Fn() -> STTResult<BoxedSTT> + Send + Sync>;
