mod base;
pub mod elevenlabs;
pub mod playht;
pub mod sentence;
pub mod synthesis;

use std::collections::HashMap;

pub use base::{
    AudioChunkStream, BaseTTS, BoxedTTS, TTSConfig, TTSError, TTSFactory, TTSResult, TextStream,
};
pub use elevenlabs::{ELEVENLABS_TTS_URL, ElevenLabsTTS, ElevenLabsTTSConfig};
pub use playht::{PLAYHT_TTS_URL, PlayHtModel, PlayHtTts, PlayHtTtsConfig};
pub use sentence::{SentenceChunker, chunk_sentences, skip_blank};
pub use synthesis::SynthesisDriver;

/// Supported TTS providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TTSProvider {
    #[default]
    ElevenLabs,
    PlayHt,
}

impl std::fmt::Display for TTSProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TTSProvider::ElevenLabs => write!(f, "elevenlabs"),
            TTSProvider::PlayHt => write!(f, "playht"),
        }
    }
}

impl std::str::FromStr for TTSProvider {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" | "eleven-labs" | "eleven_labs" => Ok(TTSProvider::ElevenLabs),
            "playht" | "play-ht" | "play_ht" | "play.ht" => Ok(TTSProvider::PlayHt),
            _ => Err(TTSError::InvalidConfiguration(format!(
                "Unsupported TTS provider: {s}. Supported providers: elevenlabs, playht"
            ))),
        }
    }
}

/// Factory function to create a TTS provider.
///
/// # Supported Providers
///
/// - `"elevenlabs"` - ElevenLabs stream-input websocket (raw PCM)
/// - `"playht"` or `"play-ht"` or `"play.ht"` - Play.ht streaming HTTP (WAV)
pub fn create_tts_provider(provider_type: &str, config: TTSConfig) -> TTSResult<BoxedTTS> {
    match provider_type.parse::<TTSProvider>()? {
        TTSProvider::ElevenLabs => Ok(Box::new(ElevenLabsTTS::new(config)?)),
        TTSProvider::PlayHt => Ok(Box::new(PlayHtTts::new(config)?)),
    }
}

/// Returns a map of provider names to their default API endpoint URLs.
pub fn get_tts_provider_urls() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    urls.insert("elevenlabs".to_string(), ELEVENLABS_TTS_URL.to_string());
    urls.insert("playht".to_string(), PLAYHT_TTS_URL.to_string());
    urls
}
