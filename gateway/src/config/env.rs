//! Environment variable loading.
//!
//! Every value is optional here; defaults are applied when merging. `.env` is loaded into
//! the process environment by `main` before this runs, so real variables win over it.

use std::env;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// Raw values read from the environment.
#[derive(Debug, Clone, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    pub deepgram_api_key: Option<String>,
    pub deepgram_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model: Option<String>,
    pub playht_api_key: Option<String>,
    pub playht_user_id: Option<String>,
    pub playht_voice: Option<String>,

    pub tts_provider: Option<String>,
    pub system_prompt: Option<String>,
    pub sentence_batching: Option<bool>,

    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u16>,
    pub audio_bit_depth: Option<u16>,
    pub audio_frame_ms: Option<u32>,
    pub audio_language: Option<String>,
    pub utterance_end_ms: Option<u32>,
    pub audio_tail_policy: Option<String>,

    pub vonage_signature_secret: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            host: var("HOST"),
            port: parse_var("PORT")?,
            public_url: var("PUBLIC_URL"),
            tls_cert_path: var("TLS_CERT_PATH"),
            tls_key_path: var("TLS_KEY_PATH"),

            deepgram_api_key: var("DEEPGRAM_API_KEY"),
            deepgram_model: var("DEEPGRAM_MODEL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL"),
            elevenlabs_api_key: var("ELEVENLABS_API_KEY"),
            elevenlabs_voice_id: var("ELEVENLABS_VOICE_ID"),
            elevenlabs_model: var("ELEVENLABS_MODEL"),
            playht_api_key: var("PLAYHT_API_KEY"),
            playht_user_id: var("PLAYHT_USER_ID"),
            playht_voice: var("PLAYHT_VOICE"),

            tts_provider: var("TTS_PROVIDER"),
            system_prompt: var("SYSTEM_PROMPT"),
            sentence_batching: parse_bool("SENTENCE_BATCHING")?,

            audio_sample_rate: parse_var("AUDIO_SAMPLE_RATE")?,
            audio_channels: parse_var("AUDIO_CHANNELS")?,
            audio_bit_depth: parse_var("AUDIO_BIT_DEPTH")?,
            audio_frame_ms: parse_var("AUDIO_FRAME_MS")?,
            audio_language: var("AUDIO_LANGUAGE"),
            utterance_end_ms: parse_var("UTTERANCE_END_MS")?,
            audio_tail_policy: var("AUDIO_TAIL_POLICY"),

            vonage_signature_secret: var("VONAGE_SIGNATURE_SECRET"),
        })
    }
}

/// A set, non-blank variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Display,
{
    var(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| format!("Invalid {name} value '{value}': {e}").into())
        })
        .transpose()
}

fn parse_bool(name: &str) -> Result<Option<bool>, Box<dyn Error>> {
    var(name)
        .map(|value| match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid {name} value '{value}': expected true or false").into()),
        })
        .transpose()
}
