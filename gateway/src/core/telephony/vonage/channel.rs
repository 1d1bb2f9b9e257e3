//! Media websocket halves.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::messages::VonageEvent;
use crate::core::telephony::base::{
    ChannelError, ChannelEvent, ChannelResult, ChannelSink, ChannelSource,
};

/// How long Vonage gets to send `websocket:connected` after the upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// What the handshake told us about the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedInfo {
    pub content_type: Option<String>,
    pub call_uuid: Option<String>,
}

/// Waits for the `websocket:connected` handshake and splits the socket.
///
/// Audio that arrives before the handshake is dropped. A content type different from
/// `expected_content_type` is logged, not rejected.
pub async fn accept_media(
    socket: WebSocket,
    expected_content_type: &str,
) -> ChannelResult<(VonageSource, VonageSink, ConnectedInfo)> {
    let (sink, mut stream) = socket.split();

    let info = timeout(HANDSHAKE_TIMEOUT, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match VonageEvent::parse(&text) {
                    Ok(VonageEvent::Connected {
                        content_type,
                        call_uuid,
                    }) => {
                        return Ok(ConnectedInfo {
                            content_type,
                            call_uuid,
                        });
                    }
                    Ok(other) => debug!("Ignoring {:?} before handshake", other),
                    Err(e) => warn!("Malformed handshake frame: {}", e),
                },
                Some(Ok(Message::Binary(audio))) => {
                    debug!(bytes = audio.len(), "Dropping audio received before handshake");
                }
                Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
            }
        }
    })
    .await
    .map_err(|_| ChannelError::Handshake("No websocket:connected frame received".to_string()))??;

    match info.content_type.as_deref() {
        Some(content_type) if content_type != expected_content_type => warn!(
            expected = expected_content_type,
            received = content_type,
            "Media content type mismatch"
        ),
        None => debug!("Handshake did not declare a content type"),
        _ => {}
    }
    info!(call_uuid = ?info.call_uuid, "Media websocket connected");

    Ok((
        VonageSource {
            stream,
            closed: false,
        },
        VonageSink { sink, closed: false },
        info,
    ))
}

pub struct VonageSource {
    stream: SplitStream<WebSocket>,
    closed: bool,
}

#[async_trait]
impl ChannelSource for VonageSource {
    async fn recv(&mut self) -> ChannelEvent {
        while !self.closed {
            match self.stream.next().await {
                Some(Ok(Message::Binary(audio))) => return ChannelEvent::Audio(audio),
                Some(Ok(Message::Text(text))) => match VonageEvent::parse(&text) {
                    Ok(VonageEvent::Dtmf { digit, duration }) => {
                        debug!(digit = %digit, ?duration, "DTMF received");
                        return ChannelEvent::Dtmf(digit);
                    }
                    Ok(other) => debug!("Ignoring media control frame {:?}", other),
                    Err(e) => warn!("Malformed media control frame: {}", e),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Media websocket closed by peer: {:?}", frame);
                    self.closed = true;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Media websocket error: {}", e);
                    self.closed = true;
                }
                None => self.closed = true,
            }
        }
        ChannelEvent::Closed
    }
}

pub struct VonageSink {
    sink: SplitSink<WebSocket, Message>,
    closed: bool,
}

#[async_trait]
impl ChannelSink for VonageSink {
    async fn send_frame(&mut self, frame: Bytes) -> ChannelResult<()> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.sink
            .send(Message::Binary(frame))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.send(Message::Close(None)).await {
            debug!("Media websocket already gone: {}", e);
        }
    }
}
