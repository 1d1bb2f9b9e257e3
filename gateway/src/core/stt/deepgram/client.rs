//! Deepgram live transcription websocket client.
//!
//! ```text
//! send_audio() ──▶ audio_tx (mpsc) ──▶ ┌──────────────────┐ ──▶ Deepgram
//!                                      │ connection task  │
//! events (mpsc) ◀── TranscriptionEvent ◀┘                  └ ◀── Results / UtteranceEnd
//! ```
//!
//! Each `connect` runs one connection task. `disconnect` (or drop) signals it over a
//! oneshot; the task sends `CloseStream` and closes the socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::DeepgramSTTConfig;
use super::messages::{ControlMessage, DeepgramMessage};
use crate::core::stt::base::{
    BaseSTT, STTConfig, STTError, STTResult, TranscriptionEvent, TranscriptionEventKind,
    TranscriptionEventSender,
};

/// Upper bound on a single audio message.
const MAX_AUDIO_CHUNK_SIZE: usize = 256 * 1024;

/// Time allowed for the websocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-message idle timeout. Deepgram sends Results continuously while audio flows.
const WS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed for the connection task to flush and close on disconnect.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct DeepgramSTT {
    config: DeepgramSTTConfig,

    /// Bounded (32) audio queue into the connection task
    audio_tx: Option<mpsc::Sender<Bytes>>,

    shutdown_tx: Option<oneshot::Sender<()>>,

    connection_handle: Option<tokio::task::JoinHandle<()>>,

    /// Cleared by the connection task when the socket goes away
    is_connected: Arc<AtomicBool>,
}

impl DeepgramSTT {
    pub fn new(config: STTConfig) -> STTResult<Self> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required for Deepgram STT".to_string(),
            ));
        }

        Ok(Self {
            config: DeepgramSTTConfig::from_base(config),
            audio_tx: None,
            shutdown_tx: None,
            connection_handle: None,
            is_connected: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &DeepgramSTTConfig {
        &self.config
    }

    /// Maps one websocket message to transcription events.
    ///
    /// # Returns
    /// * `Ok(true)` - Continue processing messages
    /// * `Ok(false)` - Vendor closed the session
    pub(crate) fn handle_websocket_message(
        message: Message,
        generation: u64,
        events: &TranscriptionEventSender,
    ) -> STTResult<bool> {
        match message {
            Message::Text(text) => match DeepgramMessage::parse(&text) {
                Ok(DeepgramMessage::Results(results)) => {
                    let transcript = results.transcript();
                    if !transcript.is_empty() {
                        let is_final = results.is_final || results.speech_final;
                        debug!(generation, is_final, "Deepgram transcript: {}", transcript);
                        forward(events, TranscriptionEvent::transcript(generation, transcript, is_final));
                    }
                }
                Ok(DeepgramMessage::UtteranceEnd(end)) => {
                    debug!(generation, last_word_end = end.last_word_end, "Deepgram utterance end");
                    forward(events, TranscriptionEvent::utterance_end(generation));
                }
                Ok(DeepgramMessage::SpeechStarted) => {
                    forward(
                        events,
                        TranscriptionEvent {
                            generation,
                            kind: TranscriptionEventKind::SpeechStarted,
                        },
                    );
                }
                Ok(DeepgramMessage::Metadata(meta)) => {
                    debug!(request_id = %meta.request_id, "Deepgram session metadata");
                }
                Ok(DeepgramMessage::Unknown(raw)) => {
                    debug!("Received unknown Deepgram message: {}", raw);
                }
                Err(e) => {
                    warn!("Failed to parse Deepgram message: {}", e);
                    forward(
                        events,
                        TranscriptionEvent {
                            generation,
                            kind: TranscriptionEventKind::Error(format!("Malformed message: {e}")),
                        },
                    );
                }
            },
            Message::Close(frame) => {
                info!("Deepgram websocket closed: {:?}", frame);
                return Ok(false);
            }
            Message::Binary(_) => debug!("Unexpected binary message from Deepgram"),
            _ => {}
        }
        Ok(true)
    }

    async fn start_connection(
        &mut self,
        generation: u64,
        events: TranscriptionEventSender,
    ) -> STTResult<()> {
        let ws_url = self.config.build_websocket_url()?;
        let host = self.config.host()?;

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(&ws_url)
            .header("Host", host)
            .header("Upgrade", "websocket")
            .header("Connection", "upgrade")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Authorization", format!("Token {}", self.config.base.api_key))
            .body(())
            .map_err(|e| {
                STTError::ConnectionFailed(format!("Failed to create WebSocket request: {e}"))
            })?;

        let (ws_stream, _response) = match timeout(CONNECT_TIMEOUT, connect_async(request)).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                let message = e.to_string();
                return Err(if message.contains("401") || message.contains("403") {
                    STTError::AuthenticationFailed(message)
                } else {
                    STTError::ConnectionFailed(format!("Failed to connect to Deepgram: {message}"))
                });
            }
            Err(_) => {
                return Err(STTError::ConnectionFailed(
                    "Timed out connecting to Deepgram".to_string(),
                ));
            }
        };

        info!(generation, "Connected to Deepgram STT WebSocket");

        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(32);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let is_connected = self.is_connected.clone();
        is_connected.store(true, Ordering::Release);

        let connection_handle = tokio::spawn(async move {
            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            loop {
                tokio::select! {
                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            error!("Failed to send audio to Deepgram: {}", e);
                            break;
                        }
                    }

                    message = timeout(WS_MESSAGE_TIMEOUT, ws_stream.next()) => {
                        match message {
                            Ok(Some(Ok(msg))) => {
                                match Self::handle_websocket_message(msg, generation, &events) {
                                    Ok(true) => {}
                                    Ok(false) => break,
                                    Err(e) => {
                                        error!("Deepgram streaming error: {}", e);
                                        break;
                                    }
                                }
                            }
                            Ok(Some(Err(e))) => {
                                error!("Deepgram WebSocket error: {}", e);
                                break;
                            }
                            Ok(None) => {
                                info!("Deepgram WebSocket stream ended");
                                break;
                            }
                            Err(_elapsed) => {
                                error!("Deepgram STT idle timeout - no message for 60 seconds");
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        debug!(generation, "Closing Deepgram session");
                        if let Ok(json) = serde_json::to_string(&ControlMessage::CloseStream) {
                            let _ = ws_sink.send(Message::Text(json.into())).await;
                        }
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            is_connected.store(false, Ordering::Release);
            info!(generation, "Deepgram STT WebSocket connection closed");
        });

        self.audio_tx = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(connection_handle);
        Ok(())
    }
}

/// Non-blocking hand-off; a full channel means the consumer is paused and the event is stale.
fn forward(events: &TranscriptionEventSender, event: TranscriptionEvent) {
    if let Err(e) = events.try_send(event) {
        debug!("Dropping transcription event: {}", e);
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

// =============================================================================
// BaseSTT Trait Implementation
// =============================================================================

#[async_trait::async_trait]
impl BaseSTT for DeepgramSTT {
    async fn connect(
        &mut self,
        generation: u64,
        events: TranscriptionEventSender,
    ) -> STTResult<()> {
        if self.connection_handle.is_some() {
            self.disconnect().await?;
        }
        self.start_connection(generation, events).await
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take()
            && timeout(DISCONNECT_TIMEOUT, handle).await.is_err()
        {
            warn!("Deepgram connection task did not stop in time");
        }

        self.audio_tx = None;
        self.is_connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn send_audio(&mut self, audio: Bytes) -> STTResult<()> {
        if !self.is_ready() {
            return Err(STTError::NotConnected);
        }

        if audio.len() > MAX_AUDIO_CHUNK_SIZE {
            return Err(STTError::InvalidAudioFormat(format!(
                "Audio chunk size {} bytes exceeds maximum {} bytes",
                audio.len(),
                MAX_AUDIO_CHUNK_SIZE
            )));
        }

        if let Some(audio_tx) = &self.audio_tx {
            audio_tx
                .send(audio)
                .await
                .map_err(|e| STTError::NetworkError(format!("Failed to send audio data: {e}")))?;
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.is_connected.load(Ordering::Acquire) && self.audio_tx.is_some()
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}
