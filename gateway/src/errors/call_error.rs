//! Session-level error taxonomy.
//!
//! | Variant | Source | Session reaction |
//! |---|---|---|
//! | `Connection` | vendor session dropped, network | logged, turn abandoned, call continues |
//! | `Configuration` | bad credentials, invalid audio settings | fatal at startup or call setup |
//! | `Protocol` | malformed vendor payload | payload dropped, call continues |
//! | `Cancelled` | shutdown or hang-up | call closes without resuming |

use thiserror::Error;

use crate::config::AudioConfigError;
use crate::core::llm::LLMError;
use crate::core::stt::STTError;
use crate::core::telephony::ChannelError;
use crate::core::tts::TTSError;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

pub type CallResult<T> = Result<T, CallError>;

impl CallError {
    /// True for errors the session survives.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CallError::Connection(_) | CallError::Protocol(_))
    }
}

impl From<STTError> for CallError {
    fn from(err: STTError) -> Self {
        match err {
            STTError::AuthenticationFailed(_) | STTError::ConfigurationError(_) => {
                CallError::Configuration(err.to_string())
            }
            STTError::InvalidAudioFormat(_) | STTError::ProviderError(_) => {
                CallError::Protocol(err.to_string())
            }
            STTError::ConnectionFailed(_) | STTError::NetworkError(_) | STTError::NotConnected => {
                CallError::Connection(err.to_string())
            }
        }
    }
}

impl From<LLMError> for CallError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AuthenticationFailed(_) | LLMError::ConfigurationError(_) => {
                CallError::Configuration(err.to_string())
            }
            LLMError::InvalidResponse(_) | LLMError::ProviderError(_) => {
                CallError::Protocol(err.to_string())
            }
            LLMError::ConnectionFailed(_) | LLMError::RateLimitExceeded(_) => {
                CallError::Connection(err.to_string())
            }
        }
    }
}

impl From<TTSError> for CallError {
    fn from(err: TTSError) -> Self {
        match err {
            TTSError::AuthenticationFailed(_) | TTSError::InvalidConfiguration(_) => {
                CallError::Configuration(err.to_string())
            }
            TTSError::ProviderError(_) | TTSError::InternalError(_) => {
                CallError::Protocol(err.to_string())
            }
            TTSError::ConnectionFailed(_) | TTSError::NetworkError(_) => {
                CallError::Connection(err.to_string())
            }
        }
    }
}

impl From<ChannelError> for CallError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Closed => CallError::Cancelled(err.to_string()),
            ChannelError::Handshake(_) => CallError::Protocol(err.to_string()),
            ChannelError::Transport(_) => CallError::Connection(err.to_string()),
        }
    }
}

impl From<AudioConfigError> for CallError {
    fn from(err: AudioConfigError) -> Self {
        CallError::Configuration(err.to_string())
    }
}
