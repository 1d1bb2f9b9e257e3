//! Load-time checks. A configuration that passes can build every session capability.

use std::error::Error;

use super::ServerConfig;
use crate::core::tts::TTSProvider;

/// Keys required by the selected adapters.
pub(super) fn validate_providers(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    require(&config.deepgram_api_key, "DEEPGRAM_API_KEY")?;
    require(&config.openai_api_key, "OPENAI_API_KEY")?;

    match config.tts_provider {
        TTSProvider::ElevenLabs => {
            require(&config.elevenlabs_api_key, "ELEVENLABS_API_KEY")?;
            require(&config.elevenlabs_voice_id, "ELEVENLABS_VOICE_ID")?;
        }
        TTSProvider::PlayHt => {
            require(&config.playht_api_key, "PLAYHT_API_KEY")?;
            require(&config.playht_user_id, "PLAYHT_USER_ID")?;
        }
    }
    Ok(())
}

/// The public URL must be an absolute http(s) or ws(s) URL.
pub(super) fn validate_public_url(public_url: &Option<String>) -> Result<(), Box<dyn Error>> {
    let Some(public_url) = public_url else {
        return Ok(());
    };
    let parsed = url::Url::parse(public_url)
        .map_err(|e| format!("Invalid PUBLIC_URL '{public_url}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        scheme => return Err(format!("Unsupported PUBLIC_URL scheme: {scheme}").into()),
    }
    if parsed.host_str().is_none() {
        return Err(format!("PUBLIC_URL '{public_url}' has no host").into());
    }
    Ok(())
}

pub(super) fn validate_tls(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    if let Some(tls) = &config.tls {
        if !tls.cert_path.exists() {
            return Err(format!("TLS certificate not found: {}", tls.cert_path.display()).into());
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key not found: {}", tls.key_path.display()).into());
        }
    }
    Ok(())
}

fn require(value: &Option<String>, name: &str) -> Result<(), Box<dyn Error>> {
    if value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        Ok(())
    } else {
        Err(format!("{name} is required but not configured").into())
    }
}
