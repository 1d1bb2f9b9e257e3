//! Telephony media channel: inbound audio and DTMF, outbound frames.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Channel closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// What the caller side delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Audio(Bytes),
    /// Keypad digit, delivered out of band
    Dtmf(String),
    /// The caller hung up or the transport failed; no further events follow
    Closed,
}

/// Inbound half of a call.
#[async_trait]
pub trait ChannelSource: Send {
    /// Waits for the next event. Must be cancel safe; after `Closed` it keeps
    /// returning `Closed`.
    async fn recv(&mut self) -> ChannelEvent;
}

/// Outbound half of a call.
#[async_trait]
pub trait ChannelSink: Send {
    /// Writes exactly one audio frame.
    async fn send_frame(&mut self, frame: Bytes) -> ChannelResult<()>;

    /// Hangs up the media leg. Idempotent.
    async fn close(&mut self);
}

pub type BoxedSource = Box<dyn ChannelSource>;
pub type BoxedSink = Box<dyn ChannelSink>;
