//! Configuration for the Deepgram live transcription API.

use url::Url;

use super::super::base::{STTConfig, STTError};
use super::DEEPGRAM_STT_URL;

/// Deepgram-specific view of an [`STTConfig`].
#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    pub base: STTConfig,
    /// Websocket endpoint, `wss://api.deepgram.com/v1/listen` unless overridden
    pub endpoint: String,
    pub smart_format: bool,
}

impl Default for DeepgramSTTConfig {
    fn default() -> Self {
        Self {
            base: STTConfig::default(),
            endpoint: DEEPGRAM_STT_URL.to_string(),
            smart_format: false,
        }
    }
}

impl DeepgramSTTConfig {
    pub fn from_base(base: STTConfig) -> Self {
        let endpoint = base
            .base_url
            .clone()
            .unwrap_or_else(|| DEEPGRAM_STT_URL.to_string());
        Self {
            base,
            endpoint,
            ..Default::default()
        }
    }

    /// Builds the listen URL with the streaming query parameters.
    ///
    /// ```text
    /// wss://api.deepgram.com/v1/listen?model=nova-2&language=en-US&encoding=linear16
    ///     &sample_rate=16000&channels=1&punctuate=true&interim_results=true
    ///     &utterance_end_ms=1000&vad_events=true
    /// ```
    pub fn build_websocket_url(&self) -> Result<String, STTError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            STTError::ConfigurationError(format!("Invalid Deepgram endpoint {}: {e}", self.endpoint))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", &self.base.model)
                .append_pair("language", &self.base.language)
                .append_pair("encoding", &self.base.encoding)
                .append_pair("sample_rate", &self.base.sample_rate.to_string())
                .append_pair("channels", &self.base.channels.to_string())
                .append_pair("punctuate", bool_str(self.base.punctuation))
                .append_pair("interim_results", bool_str(self.base.interim_results));

            // Deepgram rejects utterance_end_ms below 1000 and requires interim results for it
            if self.base.interim_results && self.base.utterance_end_ms >= 1000 {
                query.append_pair("utterance_end_ms", &self.base.utterance_end_ms.to_string());
            }
            if self.base.vad_events {
                query.append_pair("vad_events", "true");
            }
            if self.smart_format {
                query.append_pair("smart_format", "true");
            }
        }

        Ok(url.into())
    }

    /// Host header value for the websocket handshake.
    pub fn host(&self) -> Result<String, STTError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid Deepgram endpoint: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| STTError::ConfigurationError("Deepgram endpoint has no host".into()))?;
        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
