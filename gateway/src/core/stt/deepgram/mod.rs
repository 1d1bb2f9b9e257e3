//! Deepgram live streaming transcription.
//!
//! Authentication uses the `Authorization: Token <key>` header on the websocket
//! handshake. Audio is sent as raw binary linear16 frames.

pub mod client;
pub mod config;
pub mod messages;

pub use client::DeepgramSTT;
pub use config::DeepgramSTTConfig;
pub use messages::{ControlMessage, DeepgramMessage};

/// Deepgram live transcription websocket endpoint.
pub const DEEPGRAM_STT_URL: &str = "wss://api.deepgram.com/v1/listen";
