//! Combines environment values, YAML overrides and defaults into a [`ServerConfig`].

use std::error::Error;
use std::path::PathBuf;

use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{ServerConfig, StreamingAudioConfig, TailPolicy, TlsConfig};
use crate::core::llm::DEFAULT_SYSTEM_PROMPT;
use crate::core::tts::TTSProvider;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DEEPGRAM_MODEL: &str = "nova-2";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Priority: YAML > environment > defaults.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn Error>> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let conversation = yaml.conversation.unwrap_or_default();
    let audio = yaml.audio.unwrap_or_default();
    let telephony = yaml.telephony.unwrap_or_default();

    let tls = merge_tls(
        server.tls.as_ref().and_then(|tls| tls.enabled),
        server
            .tls
            .as_ref()
            .and_then(|tls| tls.cert_path.clone())
            .or(env.tls_cert_path),
        server
            .tls
            .as_ref()
            .and_then(|tls| tls.key_path.clone())
            .or(env.tls_key_path),
    )?;

    let tts_provider = conversation
        .tts_provider
        .or(env.tts_provider)
        .map(|name| name.parse::<TTSProvider>())
        .transpose()?
        .unwrap_or_default();

    let defaults = StreamingAudioConfig::default();
    let tail_policy = audio
        .tail_policy
        .or(env.audio_tail_policy)
        .map(|policy| policy.parse::<TailPolicy>())
        .transpose()?
        .unwrap_or_default();
    let audio = StreamingAudioConfig::new(
        audio
            .sample_rate
            .or(env.audio_sample_rate)
            .unwrap_or(defaults.sample_rate()),
        audio
            .channels
            .or(env.audio_channels)
            .unwrap_or(defaults.channels()),
        audio
            .bit_depth
            .or(env.audio_bit_depth)
            .unwrap_or(defaults.bit_depth()),
        audio
            .frame_ms
            .or(env.audio_frame_ms)
            .unwrap_or(defaults.frame_duration_ms()),
    )?
    .with_language(
        audio
            .language
            .or(env.audio_language)
            .unwrap_or(defaults.language),
    )
    .with_utterance_end_ms(
        audio
            .utterance_end_ms
            .or(env.utterance_end_ms)
            .unwrap_or(defaults.utterance_end_ms),
    )
    .with_tail_policy(tail_policy);

    Ok(ServerConfig {
        host: server.host.or(env.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        public_url: server.public_url.or(env.public_url),
        tls,

        deepgram_api_key: providers.deepgram_api_key.or(env.deepgram_api_key),
        deepgram_model: providers
            .deepgram_model
            .or(env.deepgram_model)
            .unwrap_or_else(|| DEFAULT_DEEPGRAM_MODEL.to_string()),
        openai_api_key: providers.openai_api_key.or(env.openai_api_key),
        openai_model: providers
            .openai_model
            .or(env.openai_model)
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        elevenlabs_api_key: providers.elevenlabs_api_key.or(env.elevenlabs_api_key),
        elevenlabs_voice_id: providers.elevenlabs_voice_id.or(env.elevenlabs_voice_id),
        elevenlabs_model: providers.elevenlabs_model.or(env.elevenlabs_model),
        playht_api_key: providers.playht_api_key.or(env.playht_api_key),
        playht_user_id: providers.playht_user_id.or(env.playht_user_id),
        playht_voice: providers.playht_voice.or(env.playht_voice),

        tts_provider,
        system_prompt: conversation
            .system_prompt
            .or(env.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        sentence_batching: conversation
            .sentence_batching
            .or(env.sentence_batching)
            .unwrap_or(true),
        audio,

        vonage_signature_secret: telephony.signature_secret.or(env.vonage_signature_secret),
    })
}

/// TLS is on when both paths are present, unless explicitly disabled.
fn merge_tls(
    enabled: Option<bool>,
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn Error>> {
    if enabled == Some(false) {
        return Ok(None);
    }
    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })),
        (None, None) if enabled != Some(true) => Ok(None),
        _ => Err("TLS requires both a certificate path and a key path".into()),
    }
}
