//! Configuration module for the Parley gateway
//!
//! Server configuration comes from `.env` files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `audio`: streaming audio format and frame size derivation
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use parley_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod audio;
mod env;
mod merge;
mod validation;
mod yaml;

pub use audio::{AudioConfigError, StreamingAudioConfig, TailPolicy};
pub use merge::{DEFAULT_DEEPGRAM_MODEL, DEFAULT_HOST, DEFAULT_OPENAI_MODEL, DEFAULT_PORT};
pub use yaml::YamlConfig;

use crate::core::llm::{DEFAULT_SYSTEM_PROMPT, LLMConfig};
use crate::core::session::SessionConfig;
use crate::core::stt::STTConfig;
use crate::core::tts::{TTSConfig, TTSProvider};

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL Vonage reaches this server on; the request Host header is used when unset
    pub public_url: Option<String>,
    pub tls: Option<TlsConfig>,

    // Transcription
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: String,

    // Generation
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    // Synthesis
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model: Option<String>,
    pub playht_api_key: Option<String>,
    pub playht_user_id: Option<String>,
    pub playht_voice: Option<String>,

    // Conversation
    pub tts_provider: TTSProvider,
    pub system_prompt: String,
    /// Group generated text by sentence before synthesis
    pub sentence_batching: bool,
    pub audio: StreamingAudioConfig,

    /// Secret for verifying signed Vonage webhooks; verification is off when unset
    pub vonage_signature_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            tls: None,
            deepgram_api_key: None,
            deepgram_model: DEFAULT_DEEPGRAM_MODEL.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            elevenlabs_api_key: None,
            elevenlabs_voice_id: None,
            elevenlabs_model: None,
            playht_api_key: None,
            playht_user_id: None,
            playht_voice: None,
            tts_provider: TTSProvider::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            sentence_batching: true,
            audio: StreamingAudioConfig::default(),
            vonage_signature_secret: None,
        }
    }
}

/// Zeroize every secret when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        for secret in [
            &mut self.deepgram_api_key,
            &mut self.openai_api_key,
            &mut self.elevenlabs_api_key,
            &mut self.playht_api_key,
            &mut self.vonage_signature_secret,
        ] {
            if let Some(secret) = secret {
                secret.zeroize();
            }
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs at startup, so it is already part of the environment.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_providers(self)?;
        validation::validate_public_url(&self.public_url)?;
        validation::validate_tls(self)?;
        Ok(())
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// True when webhook requests must carry a valid Vonage signature
    pub fn has_signature_verification(&self) -> bool {
        self.vonage_signature_secret
            .as_deref()
            .is_some_and(|secret| !secret.is_empty())
    }

    /// Get API key for a specific provider
    ///
    /// # Example
    /// ```rust,no_run
    /// use parley_gateway::config::ServerConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ServerConfig::from_env()?;
    /// let api_key = config.get_api_key("deepgram")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        match provider.to_lowercase().as_str() {
            "deepgram" => self.deepgram_api_key.clone().ok_or_else(|| {
                "Deepgram API key not configured in server environment".to_string()
            }),
            "openai" => self.openai_api_key.clone().ok_or_else(|| {
                "OpenAI API key not configured in server environment".to_string()
            }),
            "elevenlabs" => self.elevenlabs_api_key.clone().ok_or_else(|| {
                "ElevenLabs API key not configured in server environment".to_string()
            }),
            "playht" | "play.ht" | "play-ht" => self.playht_api_key.clone().ok_or_else(|| {
                "Play.ht API key not configured in server environment".to_string()
            }),
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }

    /// Transcription settings for the call audio format
    pub fn stt_config(&self) -> Result<STTConfig, String> {
        Ok(STTConfig::for_audio(
            "deepgram",
            self.get_api_key("deepgram")?,
            self.deepgram_model.clone(),
            &self.audio,
        ))
    }

    pub fn llm_config(&self) -> Result<LLMConfig, String> {
        Ok(LLMConfig {
            provider: "openai".to_string(),
            api_key: self.get_api_key("openai")?,
            model: self.openai_model.clone(),
            ..Default::default()
        })
    }

    /// Synthesis settings for the selected provider, at the call sample rate
    pub fn tts_config(&self) -> Result<TTSConfig, String> {
        let provider = self.tts_provider.to_string();
        let api_key = self.get_api_key(&provider)?;
        let config = match self.tts_provider {
            TTSProvider::ElevenLabs => TTSConfig {
                provider,
                api_key,
                voice_id: self.elevenlabs_voice_id.clone(),
                model: self.elevenlabs_model.clone().unwrap_or_default(),
                sample_rate: self.audio.sample_rate(),
                ..Default::default()
            },
            TTSProvider::PlayHt => TTSConfig {
                provider,
                api_key,
                voice_id: self.playht_voice.clone(),
                sample_rate: self.audio.sample_rate(),
                user_id: self.playht_user_id.clone(),
                ..Default::default()
            },
        };
        Ok(config)
    }

    /// Per-call session settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            audio: self.audio.clone(),
            system_prompt: self.system_prompt.clone(),
            sentence_batching: self.sentence_batching,
            ..Default::default()
        }
    }
}
