//! Streaming audio format shared by the telephony channel, transcription and synthesis.
//!
//! The frame size is derived once, at construction, and must be an exact integer:
//! `sample_rate * frame_duration * bytes_per_sample * channels`. A format that would
//! need rounding is rejected with [`AudioConfigError`] instead of being silently truncated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Defaults
// =============================================================================

/// Linear PCM at 16 kHz, the rate Vonage streams over its websocket endpoint.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

pub const DEFAULT_CHANNELS: u16 = 1;

pub const DEFAULT_BIT_DEPTH: u16 = 16;

/// Vonage sends and expects 20 ms frames.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 20;

/// 16 000 Hz * 0.020 s * 2 bytes * 1 channel.
pub const DEFAULT_FRAME_SIZE: usize = 640;

/// Encoding name as understood by the transcription vendor.
pub const DEFAULT_ENCODING: &str = "linear16";

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Silence, in milliseconds, after which the transcriber reports an utterance end.
pub const DEFAULT_UTTERANCE_END_MS: u32 = 1000;

// =============================================================================
// Errors
// =============================================================================

/// Rejected streaming audio formats.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioConfigError {
    #[error("Audio {0} must be greater than zero")]
    Zero(&'static str),

    #[error("Bit depth {0} is not a whole number of bytes")]
    PartialByte(u16),

    #[error(
        "A {frame_duration_ms}ms frame at {sample_rate}Hz is not a whole number of samples"
    )]
    FractionalFrame {
        sample_rate: u32,
        frame_duration_ms: u32,
    },

    #[error("Unknown tail policy: {0} (expected 'discard' or 'pad')")]
    UnknownTailPolicy(String),
}

// =============================================================================
// Tail Policy
// =============================================================================

/// What to do with a partial frame left in the buffer when an audio stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailPolicy {
    /// Drop the remainder. Never emits a short or padded frame.
    #[default]
    Discard,
    /// Zero-pad the remainder into one final full-size frame.
    Pad,
}

impl fmt::Display for TailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailPolicy::Discard => write!(f, "discard"),
            TailPolicy::Pad => write!(f, "pad"),
        }
    }
}

impl FromStr for TailPolicy {
    type Err = AudioConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discard" | "drop" => Ok(TailPolicy::Discard),
            "pad" | "pad_and_flush" | "flush" => Ok(TailPolicy::Pad),
            other => Err(AudioConfigError::UnknownTailPolicy(other.to_string())),
        }
    }
}

// =============================================================================
// StreamingAudioConfig
// =============================================================================

/// Audio format of a call, fixed for its whole lifetime.
///
/// The PCM shape (rate, channels, depth, frame duration) is private so the derived
/// frame size can never disagree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingAudioConfig {
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
    frame_duration_ms: u32,
    frame_size: usize,

    /// Transcription language (BCP-47)
    pub language: String,

    /// Endpointing silence reported as an utterance end
    pub utterance_end_ms: u32,

    /// Handling of the partial frame at the end of a synthesis stream
    pub tail_policy: TailPolicy,
}

impl StreamingAudioConfig {
    /// Validates a PCM format and derives its frame size.
    ///
    /// # Errors
    /// Any zero field, a bit depth that is not a multiple of 8, or a frame duration
    /// that does not cover a whole number of samples.
    pub fn new(
        sample_rate: u32,
        channels: u16,
        bit_depth: u16,
        frame_duration_ms: u32,
    ) -> Result<Self, AudioConfigError> {
        if sample_rate == 0 {
            return Err(AudioConfigError::Zero("sample rate"));
        }
        if channels == 0 {
            return Err(AudioConfigError::Zero("channel count"));
        }
        if bit_depth == 0 {
            return Err(AudioConfigError::Zero("bit depth"));
        }
        if frame_duration_ms == 0 {
            return Err(AudioConfigError::Zero("frame duration"));
        }
        if bit_depth % 8 != 0 {
            return Err(AudioConfigError::PartialByte(bit_depth));
        }

        let sample_ms = sample_rate as u64 * frame_duration_ms as u64;
        if sample_ms % 1000 != 0 {
            return Err(AudioConfigError::FractionalFrame {
                sample_rate,
                frame_duration_ms,
            });
        }

        let samples_per_frame = sample_ms / 1000;
        let frame_size = samples_per_frame * (bit_depth / 8) as u64 * channels as u64;

        Ok(Self {
            sample_rate,
            channels,
            bit_depth,
            frame_duration_ms,
            frame_size: frame_size as usize,
            language: DEFAULT_LANGUAGE.to_string(),
            utterance_end_ms: DEFAULT_UTTERANCE_END_MS,
            tail_policy: TailPolicy::default(),
        })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_utterance_end_ms(mut self, utterance_end_ms: u32) -> Self {
        self.utterance_end_ms = utterance_end_ms;
        self
    }

    pub fn with_tail_policy(mut self, tail_policy: TailPolicy) -> Self {
        self.tail_policy = tail_policy;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    pub fn frame_duration_ms(&self) -> u32 {
        self.frame_duration_ms
    }

    /// Exact size of one audio frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth / 8) as usize
    }

    /// Vendor encoding name (`linear16`).
    pub fn encoding(&self) -> &'static str {
        DEFAULT_ENCODING
    }

    /// MIME type declared to the telephony gateway, e.g. `audio/l16;rate=16000`.
    pub fn content_type(&self) -> String {
        format!("audio/l{};rate={}", self.bit_depth, self.sample_rate)
    }
}

impl Default for StreamingAudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bit_depth: DEFAULT_BIT_DEPTH,
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            frame_size: DEFAULT_FRAME_SIZE,
            language: DEFAULT_LANGUAGE.to_string(),
            utterance_end_ms: DEFAULT_UTTERANCE_END_MS,
            tail_policy: TailPolicy::default(),
        }
    }
}
