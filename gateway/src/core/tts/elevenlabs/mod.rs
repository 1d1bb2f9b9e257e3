//! ElevenLabs streaming text-to-speech over the `stream-input` websocket.
//!
//! Text is pushed as it is generated and PCM audio comes back base64-encoded in JSON
//! messages, so synthesis starts before the full answer is known.
//!
//! - Endpoint: `wss://api.elevenlabs.io/v1/text-to-speech/{voice_id}/stream-input`
//! - Authentication: `xi-api-key` header

pub mod config;
pub mod messages;
pub mod provider;

pub use config::ElevenLabsTTSConfig;
pub use messages::{ElevenLabsResponse, TextMessage, VoiceSettings};
pub use provider::ElevenLabsTTS;

/// Base of the stream-input websocket endpoint; the voice id and path suffix are appended.
pub const ELEVENLABS_TTS_URL: &str = "wss://api.elevenlabs.io/v1/text-to-speech";

/// Low-latency model used when none is configured.
pub const DEFAULT_MODEL: &str = "eleven_turbo_v2";

/// PCM sample rates the endpoint can produce.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [16000, 22050, 24000, 44100];
