pub mod base;
pub mod vonage;

pub use base::{
    BoxedSink, BoxedSource, ChannelError, ChannelEvent, ChannelResult, ChannelSink,
    ChannelSource,
};
pub use vonage::{
    AnswerParams, CallEvent, ConnectedInfo, NccoAction, NccoEndpoint, VonageEvent, VonageSink,
    VonageSource, accept_media, answer_ncco,
};
