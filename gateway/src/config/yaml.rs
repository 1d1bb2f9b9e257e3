use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here override
/// the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_url: "https://agent.example.com"
///   tls:
///     cert_path: "/etc/parley/cert.pem"
///     key_path: "/etc/parley/key.pem"
///
/// providers:
///   deepgram_api_key: "your-deepgram-key"
///   deepgram_model: "nova-2"
///   openai_api_key: "your-openai-key"
///   openai_model: "gpt-3.5-turbo"
///   elevenlabs_api_key: "your-elevenlabs-key"
///   elevenlabs_voice_id: "your-voice-id"
///   playht_api_key: "your-playht-key"
///   playht_user_id: "your-playht-user"
///
/// conversation:
///   tts_provider: "elevenlabs"
///   system_prompt: "You are a friendly receptionist."
///   sentence_batching: true
///
/// audio:
///   sample_rate: 16000
///   channels: 1
///   bit_depth: 16
///   frame_ms: 20
///   language: "en-US"
///   utterance_end_ms: 1000
///   tail_policy: "discard"
///
/// telephony:
///   signature_secret: "vonage-signature-secret"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub conversation: Option<ConversationYaml>,
    pub audio: Option<AudioYaml>,
    pub telephony: Option<TelephonyYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Externally reachable base URL used in answer instructions
    pub public_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Vendor credentials and model selection from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model: Option<String>,
    /// Play.ht API key (sent as the AUTHORIZATION header)
    pub playht_api_key: Option<String>,
    /// Play.ht user ID (required alongside playht_api_key)
    pub playht_user_id: Option<String>,
    pub playht_voice: Option<String>,
}

/// Agent behavior from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    pub tts_provider: Option<String>,
    pub system_prompt: Option<String>,
    pub sentence_batching: Option<bool>,
}

/// Call audio format from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
    pub frame_ms: Option<u32>,
    pub language: Option<String>,
    pub utterance_end_ms: Option<u32>,
    pub tail_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    /// Shared secret Vonage signs webhook requests with
    pub signature_secret: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_url: "https://agent.example.com"

providers:
  deepgram_api_key: "dg-key"
  openai_api_key: "oa-key"
  openai_model: "gpt-4o-mini"
  elevenlabs_api_key: "el-key"
  elevenlabs_voice_id: "voice-1"

conversation:
  tts_provider: "playht"
  sentence_batching: false

audio:
  sample_rate: 8000
  frame_ms: 20
  tail_policy: "pad"

telephony:
  signature_secret: "shh"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.public_url.as_deref(), Some("https://agent.example.com"));

        let providers = config.providers.as_ref().unwrap();
        assert_eq!(providers.deepgram_api_key.as_deref(), Some("dg-key"));
        assert_eq!(providers.openai_model.as_deref(), Some("gpt-4o-mini"));
        assert!(providers.playht_api_key.is_none());

        let conversation = config.conversation.as_ref().unwrap();
        assert_eq!(conversation.tts_provider.as_deref(), Some("playht"));
        assert_eq!(conversation.sentence_batching, Some(false));

        let audio = config.audio.as_ref().unwrap();
        assert_eq!(audio.sample_rate, Some(8000));
        assert!(audio.channels.is_none());
        assert_eq!(audio.tail_policy.as_deref(), Some("pad"));

        assert_eq!(
            config.telephony.unwrap().signature_secret.as_deref(),
            Some("shh")
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.providers.is_none());
        assert!(config.audio.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap_or_default();

        assert!(config.server.is_none());
        assert!(config.telephony.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "audio:\n  utterance_end_ms: 1500\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.audio.unwrap().utterance_end_ms, Some(1500));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "server: [unclosed").unwrap();

        let err = YamlConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
