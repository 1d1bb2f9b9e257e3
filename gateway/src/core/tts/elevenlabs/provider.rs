//! ElevenLabs stream-input client.
//!
//! `connect` performs the websocket handshake. `synthesize` splits the socket: a writer
//! task pushes text chunks and the end-of-input marker, and the returned stream reads
//! audio until the vendor sends `isFinal`. `close` (or drop) tells the writer to send a
//! close frame.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::config::ElevenLabsTTSConfig;
use super::messages::{ElevenLabsResponse, TextMessage};
use crate::core::tts::base::{
    AudioChunkStream, BaseTTS, TTSConfig, TTSError, TTSResult, TextStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-message idle timeout while waiting for audio.
const WS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(20);

pub struct ElevenLabsTTS {
    config: ElevenLabsTTSConfig,
    ws: Option<WsStream>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    closed: bool,
}

impl ElevenLabsTTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        Ok(Self {
            config: ElevenLabsTTSConfig::from_base(config)?,
            ws: None,
            shutdown_tx: None,
            closed: false,
        })
    }

    pub fn config(&self) -> &ElevenLabsTTSConfig {
        &self.config
    }

    fn encode(message: &TextMessage) -> TTSResult<Message> {
        serde_json::to_string(message)
            .map(|json| Message::Text(json.into()))
            .map_err(|e| TTSError::InternalError(format!("Failed to encode text message: {e}")))
    }
}

#[async_trait]
impl BaseTTS for ElevenLabsTTS {
    async fn connect(&mut self) -> TTSResult<()> {
        if self.closed {
            return Err(TTSError::ConnectionFailed("Session already closed".to_string()));
        }

        let ws_url = self.config.build_websocket_url()?;
        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(&ws_url)
            .header("Host", self.config.host()?)
            .header("Upgrade", "websocket")
            .header("Connection", "upgrade")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("xi-api-key", &self.config.base.api_key)
            .body(())
            .map_err(|e| {
                TTSError::ConnectionFailed(format!("Failed to create WebSocket request: {e}"))
            })?;

        let (ws, _response) = match timeout(CONNECT_TIMEOUT, connect_async(request)).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                let message = e.to_string();
                return Err(if message.contains("401") || message.contains("403") {
                    TTSError::AuthenticationFailed(message)
                } else {
                    TTSError::ConnectionFailed(format!("Failed to connect to ElevenLabs: {message}"))
                });
            }
            Err(_) => {
                return Err(TTSError::ConnectionFailed(
                    "Timed out connecting to ElevenLabs".to_string(),
                ));
            }
        };

        info!(voice_id = %self.config.voice_id, model = %self.config.model, "Connected to ElevenLabs TTS WebSocket");
        self.ws = Some(ws);
        Ok(())
    }

    fn synthesize(&mut self, mut text: TextStream) -> TTSResult<AudioChunkStream> {
        let ws = self
            .ws
            .take()
            .ok_or_else(|| TTSError::ConnectionFailed("Not connected to ElevenLabs".to_string()))?;
        let (mut sink, mut source) = ws.split();

        let begin = Self::encode(&TextMessage::begin(self.config.voice_settings.clone()))?;
        let end = Self::encode(&TextMessage::end())?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            if let Err(e) = sink.send(begin).await {
                warn!("Failed to start ElevenLabs stream: {}", e);
                return;
            }

            loop {
                tokio::select! {
                    chunk = text.next() => {
                        let message = match chunk {
                            Some(chunk) => match Self::encode(&TextMessage::chunk(&chunk)) {
                                Ok(message) => message,
                                Err(e) => {
                                    warn!("{}", e);
                                    continue;
                                }
                            },
                            None => {
                                if let Err(e) = sink.send(end).await {
                                    warn!("Failed to end ElevenLabs stream: {}", e);
                                }
                                break;
                            }
                        };
                        if let Err(e) = sink.send(message).await {
                            warn!("Failed to send text to ElevenLabs: {}", e);
                            return;
                        }
                    }
                    _ = &mut shutdown_rx => {
                        let _ = sink.send(Message::Close(None)).await;
                        return;
                    }
                }
            }

            // Input is complete; keep the sink until the session is released.
            let _ = shutdown_rx.await;
            let _ = sink.send(Message::Close(None)).await;
            debug!("ElevenLabs writer finished");
        });

        Ok(Box::pin(stream! {
            loop {
                match timeout(WS_MESSAGE_TIMEOUT, source.next()).await {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        let response = match ElevenLabsResponse::parse(&text) {
                            Ok(response) => response,
                            Err(e) => {
                                warn!("Dropping malformed ElevenLabs message: {}", e);
                                continue;
                            }
                        };
                        if let Some(message) = response.error_message() {
                            yield Err(TTSError::ProviderError(message));
                            break;
                        }
                        match response.decode_audio() {
                            Ok(Some(audio)) => yield Ok(audio),
                            Ok(None) => {}
                            Err(e) => warn!("Dropping undecodable ElevenLabs audio: {}", e),
                        }
                        if response.is_final() {
                            debug!("ElevenLabs stream complete");
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Close(frame)))) => {
                        debug!("ElevenLabs websocket closed: {:?}", frame);
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(e))) => {
                        yield Err(TTSError::NetworkError(format!("ElevenLabs WebSocket error: {e}")));
                        break;
                    }
                    Ok(None) => break,
                    Err(_elapsed) => {
                        yield Err(TTSError::NetworkError(
                            "ElevenLabs idle timeout waiting for audio".to_string(),
                        ));
                        break;
                    }
                }
            }
        }))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.ws = None;
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        debug!("ElevenLabs session released");
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}

impl Drop for ElevenLabsTTS {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn config() -> TTSConfig {
        TTSConfig {
            provider: "elevenlabs".to_string(),
            api_key: "xi-key".to_string(),
            voice_id: Some("voice123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_validates_config() {
        assert!(ElevenLabsTTS::new(config()).is_ok());
        assert!(matches!(
            ElevenLabsTTS::new(TTSConfig::default()),
            Err(TTSError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_requires_connection() {
        let mut tts = ElevenLabsTTS::new(config()).unwrap();
        let text: TextStream = Box::pin(stream::iter(vec!["Hi".to_string()]));
        assert!(matches!(
            tts.synthesize(text),
            Err(TTSError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut tts = ElevenLabsTTS::new(config()).unwrap();
        tts.close();
        tts.close();
        assert!(matches!(
            tts.connect().await,
            Err(TTSError::ConnectionFailed(_))
        ));
        assert_eq!(tts.preamble_chunks(), 0);
    }
}
