//! ElevenLabs session configuration.

use url::Url;

use super::{DEFAULT_MODEL, ELEVENLABS_TTS_URL, SUPPORTED_SAMPLE_RATES};
use super::messages::VoiceSettings;
use crate::core::tts::base::{TTSConfig, TTSError, TTSResult};

#[derive(Debug, Clone)]
pub struct ElevenLabsTTSConfig {
    pub base: TTSConfig,
    pub voice_id: String,
    pub model: String,
    pub voice_settings: VoiceSettings,
    /// Websocket endpoint base, overridable for tests
    pub endpoint: String,
}

impl ElevenLabsTTSConfig {
    pub fn from_base(base: TTSConfig) -> TTSResult<Self> {
        if base.api_key.is_empty() {
            return Err(TTSError::AuthenticationFailed(
                "API key is required for ElevenLabs TTS".to_string(),
            ));
        }
        let voice_id = base
            .voice_id
            .clone()
            .filter(|voice| !voice.trim().is_empty())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration("ElevenLabs requires a voice id".to_string())
            })?;
        if !SUPPORTED_SAMPLE_RATES.contains(&base.sample_rate) {
            return Err(TTSError::InvalidConfiguration(format!(
                "ElevenLabs PCM output does not support {} Hz (supported: {:?})",
                base.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }

        let model = if base.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            base.model.clone()
        };
        let endpoint = base
            .base_url
            .clone()
            .unwrap_or_else(|| ELEVENLABS_TTS_URL.to_string());

        Ok(Self {
            base,
            voice_id,
            model,
            voice_settings: VoiceSettings::default(),
            endpoint,
        })
    }

    pub fn output_format(&self) -> String {
        format!("pcm_{}", self.base.sample_rate)
    }

    pub fn build_websocket_url(&self) -> TTSResult<String> {
        let raw = format!(
            "{}/{}/stream-input",
            self.endpoint.trim_end_matches('/'),
            self.voice_id
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| TTSError::InvalidConfiguration(format!("Invalid ElevenLabs URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model_id", &self.model)
            .append_pair("output_format", &self.output_format());
        Ok(url.to_string())
    }

    pub fn host(&self) -> TTSResult<String> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| TTSError::InvalidConfiguration(format!("Invalid ElevenLabs URL: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| TTSError::InvalidConfiguration("ElevenLabs URL has no host".to_string()))?;
        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}
