pub mod audio;
pub mod llm;
pub mod session;
pub mod stt;
pub mod telephony;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::{FrameBufferSummary, FrameStream};
pub use llm::{
    BaseLLM, ConversationHistory, GenerationDriver, LLMConfig, LLMError, LLMResult, SharedLLM,
    create_llm_provider,
};
pub use session::{
    CallSession, CallState, EndReason, SessionCapabilities, SessionConfig, SessionSummary,
};
pub use stt::{
    BaseSTT, STTConfig, STTError, STTProvider, STTResult, Transcription, UtteranceBridge,
    UtteranceSignal, create_stt_provider, get_supported_stt_providers,
};
pub use telephony::{ChannelError, ChannelEvent, ChannelSink, ChannelSource};
pub use tts::{
    BaseTTS, BoxedTTS, SynthesisDriver, TTSConfig, TTSError, TTSFactory, TTSProvider, TTSResult,
    create_tts_provider, get_tts_provider_urls,
};
