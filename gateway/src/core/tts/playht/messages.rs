//! Play.ht request and error bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::PlayHtTtsConfig;

#[derive(Debug, Clone, Serialize)]
pub struct PlayHtTtsRequest {
    pub text: String,
    pub voice: String,
    pub voice_engine: String,
    pub output_format: String,
    pub sample_rate: u32,
    pub speed: f32,
}

impl PlayHtTtsRequest {
    /// WAV request for `text` with the session's voice settings.
    pub fn wav(config: &PlayHtTtsConfig, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: config.voice.clone(),
            voice_engine: config.voice_engine.as_str().to_string(),
            output_format: "wav".to_string(),
            sample_rate: config.sample_rate,
            speed: config.speed,
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayHtApiError {
    #[serde(default, alias = "error_message")]
    pub message: Option<String>,
    #[serde(default, alias = "error_id")]
    pub code: Option<String>,
}

impl fmt::Display for PlayHtApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "[{code}] {message}"),
            (None, Some(message)) => f.write_str(message),
            (Some(code), None) => write!(f, "[{code}]"),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::TTSConfig;

    #[test]
    fn test_request_body() {
        let config = PlayHtTtsConfig::from_base(TTSConfig {
            api_key: "k".to_string(),
            user_id: Some("u".to_string()),
            ..Default::default()
        })
        .unwrap();
        let body = serde_json::to_value(PlayHtTtsRequest::wav(&config, "Hello")).unwrap();

        assert_eq!(body["text"], "Hello");
        assert_eq!(body["voice_engine"], "PlayHT2.0-turbo");
        assert_eq!(body["output_format"], "wav");
        assert_eq!(body["sample_rate"], 16000);
    }

    #[test]
    fn test_api_error_display() {
        let error: PlayHtApiError =
            serde_json::from_str(r#"{"error_message":"Voice not found","error_id":"VOICE_NOT_FOUND"}"#)
                .unwrap();
        assert_eq!(error.to_string(), "[VOICE_NOT_FOUND] Voice not found");
    }
}
