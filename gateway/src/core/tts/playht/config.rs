//! Play.ht request configuration.

use std::fmt;

use super::{DEFAULT_VOICE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, PLAYHT_TTS_URL};
use crate::core::tts::base::{TTSConfig, TTSError, TTSResult};

/// Play.ht voice engines usable for streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayHtModel {
    #[default]
    PlayHt20Turbo,
    Play30Mini,
}

impl PlayHtModel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlayHtModel::PlayHt20Turbo => "PlayHT2.0-turbo",
            PlayHtModel::Play30Mini => "Play3.0-mini",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "playht2.0-turbo" | "playht2-turbo" => Some(PlayHtModel::PlayHt20Turbo),
            "play3.0-mini" | "play3-mini" => Some(PlayHtModel::Play30Mini),
            _ => None,
        }
    }
}

impl fmt::Display for PlayHtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PlayHtTtsConfig {
    pub base: TTSConfig,
    pub user_id: String,
    pub voice: String,
    pub voice_engine: PlayHtModel,
    pub sample_rate: u32,
    pub speed: f32,
    pub url: String,
}

impl PlayHtTtsConfig {
    pub fn from_base(base: TTSConfig) -> TTSResult<Self> {
        if base.api_key.is_empty() {
            return Err(TTSError::AuthenticationFailed(
                "API key is required for Play.ht TTS".to_string(),
            ));
        }
        let user_id = base
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                TTSError::AuthenticationFailed("Play.ht requires a user id".to_string())
            })?;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&base.sample_rate) {
            return Err(TTSError::InvalidConfiguration(format!(
                "Play.ht sample rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                base.sample_rate
            )));
        }

        let voice_engine = if base.model.is_empty() {
            PlayHtModel::default()
        } else {
            PlayHtModel::parse(&base.model).ok_or_else(|| {
                TTSError::InvalidConfiguration(format!("Unknown Play.ht voice engine: {}", base.model))
            })?
        };
        let voice = base
            .voice_id
            .clone()
            .filter(|voice| !voice.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VOICE.to_string());
        let url = base
            .base_url
            .clone()
            .unwrap_or_else(|| PLAYHT_TTS_URL.to_string());

        Ok(Self {
            sample_rate: base.sample_rate,
            base,
            user_id,
            voice,
            voice_engine,
            speed: 1.0,
            url,
        })
    }
}
