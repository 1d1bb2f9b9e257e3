mod base;
pub mod bridge;
pub mod deepgram;
pub mod transcription;

pub use base::{
    BaseSTT, BoxedSTT, STTConfig, STTError, STTFactory, STTResult, TranscriptionEvent,
    TranscriptionEventKind, TranscriptionEventSender,
};
pub use bridge::{PauseGate, UtteranceBridge, UtteranceSignal};
pub use deepgram::{DEEPGRAM_STT_URL, DeepgramSTT, DeepgramSTTConfig};
pub use transcription::{EVENT_CHANNEL_CAPACITY, ReconnectionConfig, Transcription};

/// Supported STT providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Deepgram live streaming websocket API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: deepgram"
            ))),
        }
    }
}

/// Factory function to create STT providers by name
///
/// # Examples
/// ```rust,no_run
/// use parley_gateway::core::stt::{create_stt_provider, STTConfig};
///
/// let config = STTConfig {
///     api_key: "your-deepgram-api-key".to_string(),
///     ..Default::default()
/// };
/// let stt = create_stt_provider("deepgram", config).unwrap();
/// assert!(!stt.is_ready());
/// ```
pub fn create_stt_provider(provider: &str, config: STTConfig) -> STTResult<BoxedSTT> {
    match provider.parse::<STTProvider>()? {
        STTProvider::Deepgram => Ok(Box::new(DeepgramSTT::new(config)?)),
    }
}

/// Get a list of all supported STT providers
pub fn get_supported_stt_providers() -> Vec<&'static str> {
    vec!["deepgram"]
}
