//! Play.ht streaming text-to-speech over HTTP.
//!
//! Every text chunk becomes one `POST /api/v2/tts/stream` request answering with a WAV
//! stream. Only the first response's header is passed on (as its own chunk, declared as
//! preamble); later headers are dropped so the audio reads as one continuous stream.
//!
//! Play.ht uses dual-header authentication:
//! - `X-USER-ID`: the account user id
//! - `AUTHORIZATION`: the API key

pub mod config;
pub mod messages;
pub mod provider;
pub mod wav;

pub use config::{PlayHtModel, PlayHtTtsConfig};
pub use messages::{PlayHtApiError, PlayHtTtsRequest};
pub use provider::PlayHtTts;
pub use wav::{WavChunk, WavHeaderSplitter};

/// Play.ht TTS HTTP streaming endpoint.
pub const PLAYHT_TTS_URL: &str = "https://api.play.ht/api/v2/tts/stream";

/// Voice used when none is configured.
pub const DEFAULT_VOICE: &str = "s3://peregrine-voices/oliver_narrative2_parrot_saad/manifest.json";

/// Maximum characters per TTS request.
pub const MAX_TEXT_LENGTH: usize = 20000;

/// Sample rates accepted by the streaming endpoint.
pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 48000;
