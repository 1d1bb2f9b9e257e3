//! Vonage Voice API: NCCO answers, event callbacks and the websocket media leg.
//!
//! The answer webhook returns an NCCO that connects the call to `wss://<host>/ws`. Vonage
//! then opens the websocket, sends one `websocket:connected` text frame and streams
//! 16-bit linear PCM as binary frames in both directions.

pub mod channel;
pub mod messages;
pub mod ncco;

pub use channel::{ConnectedInfo, VonageSink, VonageSource, accept_media};
pub use messages::{AnswerParams, CallEvent, VonageEvent};
pub use ncco::{NccoAction, NccoEndpoint, answer_ncco};

/// Header carrying the call id from the NCCO into the media handshake.
pub const CALL_UUID_HEADER: &str = "call_uuid";
