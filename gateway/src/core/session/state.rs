use std::fmt;

use serde::Serialize;

/// Turn-taking state of a call.
///
/// ```text
/// LISTENING ──utterance end──▶ GENERATING ──first frame──▶ SPEAKING
///     ▲                            │ (silent turn,            │
///     └────────── resume ──────────┴── no text, failure) ◀────┘ synthesis done
///
/// any state ──hang-up / shutdown──▶ CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    Listening,
    Generating,
    Speaking,
    Closed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Closed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Listening => write!(f, "LISTENING"),
            CallState::Generating => write!(f, "GENERATING"),
            CallState::Speaking => write!(f, "SPEAKING"),
            CallState::Closed => write!(f, "CLOSED"),
        }
    }
}
