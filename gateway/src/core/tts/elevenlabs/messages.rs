//! Wire messages of the stream-input protocol.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
        }
    }
}

/// Client to server text message.
///
/// The first message carries a single space and the voice settings; an empty `text`
/// marks the end of input.
#[derive(Debug, Clone, Serialize)]
pub struct TextMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_trigger_generation: Option<bool>,
}

impl TextMessage {
    pub fn begin(voice_settings: VoiceSettings) -> Self {
        Self {
            text: " ".to_string(),
            voice_settings: Some(voice_settings),
            try_trigger_generation: None,
        }
    }

    /// A chunk of text. The trailing space tells the vendor the chunk ends on a word boundary.
    pub fn chunk(text: &str) -> Self {
        Self {
            text: format!("{} ", text.trim_end()),
            voice_settings: None,
            try_trigger_generation: Some(true),
        }
    }

    pub fn end() -> Self {
        Self {
            text: String::new(),
            voice_settings: None,
            try_trigger_generation: None,
        }
    }
}

/// Server to client message. Audio and the final marker may arrive together.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevenLabsResponse {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ElevenLabsResponse {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decoded PCM, if the message carries any.
    pub fn decode_audio(&self) -> Result<Option<Bytes>, base64::DecodeError> {
        match self.audio.as_deref() {
            Some(encoded) if !encoded.is_empty() => Ok(Some(Bytes::from(STANDARD.decode(encoded)?))),
            _ => Ok(None),
        }
    }

    pub fn is_final(&self) -> bool {
        self.is_final.unwrap_or(false)
    }

    pub fn error_message(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => Some(format!("{error}: {message}")),
            (Some(error), None) => Some(error.clone()),
            _ => None,
        }
    }
}
