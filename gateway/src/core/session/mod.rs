//! Per-call session: owns transcription, generation and synthesis and sequences turns.

pub mod machine;
pub mod state;

pub use machine::{CallSession, EndReason, SessionCapabilities, SessionConfig, SessionSummary};
pub use state::CallState;
