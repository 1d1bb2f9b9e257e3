//! Play.ht streaming HTTP client.

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::MAX_TEXT_LENGTH;
use super::config::PlayHtTtsConfig;
use super::messages::{PlayHtApiError, PlayHtTtsRequest};
use super::wav::{WavChunk, WavHeaderSplitter};
use crate::core::tts::base::{
    AudioChunkStream, BaseTTS, TTSConfig, TTSError, TTSResult, TextStream,
};

pub struct PlayHtTts {
    config: PlayHtTtsConfig,
    client: reqwest::Client,
    /// Stops in-flight requests when the session is released
    cancel: CancellationToken,
}

impl PlayHtTts {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        let config = PlayHtTtsConfig::from_base(config)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TTSError::InternalError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &PlayHtTtsConfig {
        &self.config
    }

    fn validate_text(text: &str) -> TTSResult<()> {
        let char_count = text.chars().count();
        if char_count > MAX_TEXT_LENGTH {
            return Err(TTSError::InvalidConfiguration(format!(
                "Text exceeds maximum length of {MAX_TEXT_LENGTH} characters (got {char_count})"
            )));
        }
        Ok(())
    }

    /// Maps a failed response to an error, using the API error body when it parses.
    pub fn error_from_response(status: u16, body: Option<&[u8]>) -> TTSError {
        let api_error = body
            .and_then(|body| serde_json::from_slice::<PlayHtApiError>(body).ok())
            .filter(|error| error.message.is_some() || error.code.is_some());

        if let Some(error) = &api_error {
            warn!(
                status,
                error_message = ?error.message,
                error_code = ?error.code,
                "Play.ht API error"
            );
        }

        let detail = api_error
            .map(|error| error.to_string())
            .unwrap_or_else(|| format!("status {status}"));
        match status {
            401 | 403 => TTSError::AuthenticationFailed(format!(
                "Play.ht rejected the credentials ({detail}). Verify the API key and user id."
            )),
            429 => TTSError::ProviderError(format!("Play.ht rate limit exceeded: {detail}")),
            500..=599 => TTSError::ProviderError(format!("Play.ht server error: {detail}")),
            _ => TTSError::ProviderError(format!("Play.ht API error: {detail}")),
        }
    }

    async fn request(
        client: &reqwest::Client,
        config: &PlayHtTtsConfig,
        text: &str,
    ) -> TTSResult<reqwest::Response> {
        Self::validate_text(text)?;

        let response = client
            .post(&config.url)
            .header("X-USER-ID", &config.user_id)
            .header("AUTHORIZATION", &config.base.api_key)
            .header("Accept", "audio/wav")
            .json(&PlayHtTtsRequest::wav(config, text))
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Play.ht request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.ok();
            return Err(Self::error_from_response(status.as_u16(), body.as_deref()));
        }
        Ok(response)
    }
}

#[async_trait]
impl BaseTTS for PlayHtTts {
    async fn connect(&mut self) -> TTSResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TTSError::ConnectionFailed("Session already closed".to_string()));
        }
        debug!(voice = %self.config.voice, engine = %self.config.voice_engine, "Play.ht session ready");
        Ok(())
    }

    fn synthesize(&mut self, mut text: TextStream) -> TTSResult<AudioChunkStream> {
        if self.cancel.is_cancelled() {
            return Err(TTSError::ConnectionFailed("Session already closed".to_string()));
        }
        let client = self.client.clone();
        let config = self.config.clone();
        let cancel = self.cancel.clone();

        Ok(Box::pin(stream! {
            // The first response's header is always emitted, possibly empty, so the
            // declared preamble count holds.
            let mut header_sent = false;
            let mut requests = 0usize;

            'requests: while let Some(chunk) = text.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                requests += 1;
                let response = match Self::request(&client, &config, &chunk).await {
                    Ok(response) => response,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                let mut splitter = WavHeaderSplitter::new();
                let mut body = response.bytes_stream();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'requests,
                        next = body.next() => next,
                    };
                    match next {
                        Some(Ok(bytes)) => {
                            for piece in splitter.feed(bytes) {
                                match piece {
                                    WavChunk::Header(header) => {
                                        if !header_sent {
                                            header_sent = true;
                                            yield Ok(header);
                                        }
                                    }
                                    WavChunk::Samples(samples) => {
                                        if !header_sent {
                                            header_sent = true;
                                            yield Ok(Bytes::new());
                                        }
                                        yield Ok(samples);
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            yield Err(TTSError::NetworkError(format!("Play.ht stream error: {e}")));
                            break 'requests;
                        }
                        None => break,
                    }
                }

                let dropped = splitter.finish();
                if dropped > 0 {
                    warn!(dropped, "Play.ht response ended inside the WAV header");
                }
            }
            info!(requests, "Play.ht synthesis finished");
        }))
    }

    fn close(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            debug!("Play.ht session released");
        }
    }

    fn preamble_chunks(&self) -> usize {
        1
    }

    fn provider_name(&self) -> &'static str {
        "playht"
    }
}

impl Drop for PlayHtTts {
    fn drop(&mut self) {
        self.close();
    }
}
