//! Vonage webhook payloads and websocket control messages.

use serde::Deserialize;
use serde_json::Value;

/// Text frames on the media websocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum VonageEvent {
    #[serde(rename = "websocket:connected")]
    Connected {
        #[serde(rename = "content-type", default)]
        content_type: Option<String>,
        /// NCCO headers are echoed back at the top level
        #[serde(default)]
        call_uuid: Option<String>,
    },
    #[serde(rename = "websocket:dtmf")]
    Dtmf {
        #[serde(deserialize_with = "digit_as_string")]
        digit: String,
        #[serde(default)]
        duration: Option<u64>,
    },
    #[serde(other)]
    Unknown,
}

impl VonageEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

fn digit_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(digit) => Ok(digit),
        Value::Number(digit) => Ok(digit.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid digit: {other}"))),
    }
}

/// Answer webhook parameters (query string for GET, JSON body for POST).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerParams {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub conversation_uuid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Event webhook payload. Only the fields worth logging are typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEvent {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub conversation_uuid: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}
