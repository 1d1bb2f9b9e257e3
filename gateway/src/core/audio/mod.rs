//! Audio framing between vendor streams and the telephony channel.

pub mod frame_buffer;

pub use frame_buffer::{CloseHook, FrameBufferSummary, FrameStream};
