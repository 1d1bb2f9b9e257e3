//! Deepgram live transcription wire messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultChannel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// `{"type":"Results", ...}` transcript hypothesis.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    pub channel: ResultChannel,
    /// The text of this segment will not change any more
    #[serde(default)]
    pub is_final: bool,
    /// Deepgram's endpointer detected the end of speech
    #[serde(default)]
    pub speech_final: bool,
}

impl ResultsMessage {
    pub fn transcript(&self) -> &str {
        self.channel
            .alternatives
            .first()
            .map(|alt| alt.transcript.as_str())
            .unwrap_or_default()
    }
}

/// `{"type":"UtteranceEnd","last_word_end":2.3}`
#[derive(Debug, Clone, Deserialize)]
pub struct UtteranceEndMessage {
    #[serde(default)]
    pub last_word_end: f64,
}

/// `{"type":"Metadata","request_id":...}`
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataMessage {
    #[serde(default)]
    pub request_id: String,
}

/// Incoming message, dispatched on its `type` field.
#[derive(Debug, Clone)]
pub enum DeepgramMessage {
    Results(ResultsMessage),
    UtteranceEnd(UtteranceEndMessage),
    SpeechStarted,
    Metadata(MetadataMessage),
    /// Unknown message type (for forward compatibility)
    Unknown(String),
}

impl DeepgramMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type")]
            message_type: String,
        }

        let peek: TypePeek = serde_json::from_str(text)?;

        match peek.message_type.as_str() {
            "Results" => Ok(DeepgramMessage::Results(serde_json::from_str(text)?)),
            "UtteranceEnd" => Ok(DeepgramMessage::UtteranceEnd(serde_json::from_str(text)?)),
            "SpeechStarted" => Ok(DeepgramMessage::SpeechStarted),
            "Metadata" => Ok(DeepgramMessage::Metadata(serde_json::from_str(text)?)),
            _ => Ok(DeepgramMessage::Unknown(text.to_string())),
        }
    }
}

/// Outgoing control message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Flush and close the vendor session
    CloseStream,
    KeepAlive,
}
