//! Mock capability implementations
//!
//! Stand-ins for the transcription, generation and synthesis vendors, plus in-memory
//! telephony channel halves. Every mock records what happened to it in a shared
//! [`Journal`] so tests can assert on ordering across capabilities.

// Not every test binary uses every mock
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use parley_gateway::core::llm::{BaseLLM, ChatMessage, FragmentStream, LLMError, LLMResult};
use parley_gateway::core::session::{CallState, SessionCapabilities};
use parley_gateway::core::stt::{
    BaseSTT, STTResult, TranscriptionEvent, TranscriptionEventSender,
};
use parley_gateway::core::telephony::{
    ChannelError, ChannelEvent, ChannelResult, ChannelSink, ChannelSource,
};
use parley_gateway::core::tts::{AudioChunkStream, BaseTTS, TTSError, TTSResult, TextStream};
use parley_gateway::errors::CallResult;
use parley_gateway::state::CapabilityBuilder;

// =============================================================================
// Journal
// =============================================================================

#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
    events: Mutex<Option<(u64, TranscriptionEventSender)>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().clone()
    }

    /// Generation of the live transcription session, if any.
    pub fn generation(&self) -> Option<u64> {
        self.events.lock().as_ref().map(|(generation, _)| *generation)
    }

    /// Emits a final transcript from the current transcription session.
    pub async fn say(&self, text: &str) {
        if let Some((generation, sender)) = self.sender() {
            let _ = sender
                .send(TranscriptionEvent::transcript(generation, text, true))
                .await;
        }
    }

    /// Emits an utterance end from the current transcription session.
    pub async fn end_utterance(&self) {
        if let Some((generation, sender)) = self.sender() {
            let _ = sender
                .send(TranscriptionEvent::utterance_end(generation))
                .await;
        }
    }

    fn sender(&self) -> Option<(u64, TranscriptionEventSender)> {
        self.events.lock().clone()
    }

    /// Polls until `count(prefix)` reaches `at_least`.
    pub async fn wait_for(&self, prefix: &str, at_least: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(prefix) < at_least {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {at_least} x {prefix}"));
    }
}

pub async fn wait_for_state(state: &mut watch::Receiver<CallState>, wanted: CallState) {
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == wanted))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
        .expect("session dropped its state sender");
}

// =============================================================================
// Transcription
// =============================================================================

pub struct MockSTT {
    journal: Arc<Journal>,
    ready: bool,
}

impl MockSTT {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            ready: false,
        }
    }
}

#[async_trait]
impl BaseSTT for MockSTT {
    async fn connect(
        &mut self,
        generation: u64,
        events: TranscriptionEventSender,
    ) -> STTResult<()> {
        self.journal.log(format!("stt.connect:{generation}"));
        *self.journal.events.lock() = Some((generation, events));
        self.ready = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        if self.ready {
            self.journal.log("stt.disconnect");
        }
        self.ready = false;
        Ok(())
    }

    async fn send_audio(&mut self, audio: Bytes) -> STTResult<()> {
        self.journal.log(format!("stt.audio:{}", audio.len()));
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn provider_name(&self) -> &'static str {
        "mock-stt"
    }
}

// =============================================================================
// Generation
// =============================================================================

/// How the mock language model answers.
#[derive(Clone)]
pub enum Reply {
    /// Streams the given fragments
    Fragments(Vec<String>),
    /// Echoes the user input as "You said <input>."
    Echo,
    /// Fails before streaming
    Fail,
    /// Streams one fragment, then fails
    FailMidStream(String),
    /// Streams one fragment, then never finishes
    Hang(String),
}

pub struct MockLLM {
    journal: Arc<Journal>,
    reply: Reply,
}

impl MockLLM {
    pub fn new(journal: Arc<Journal>, reply: Reply) -> Self {
        Self { journal, reply }
    }
}

#[async_trait]
impl BaseLLM for MockLLM {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> LLMResult<FragmentStream> {
        let input = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        self.journal.log(format!("llm.request:{input}"));
        self.journal.prompts.lock().push(messages);

        let fragments: FragmentStream = match self.reply.clone() {
            Reply::Fragments(items) => Box::pin(stream::iter(items.into_iter().map(Ok))),
            Reply::Echo => Box::pin(stream::iter(vec![
                Ok("You said ".to_string()),
                Ok(format!("{input}.")),
            ])),
            Reply::Fail => {
                return Err(LLMError::ConnectionFailed("model unavailable".to_string()));
            }
            Reply::FailMidStream(first) => Box::pin(stream::iter(vec![
                Ok(first),
                Err(LLMError::ConnectionFailed("stream reset".to_string())),
            ])),
            Reply::Hang(first) => Box::pin(stream::iter(vec![Ok(first)]).chain(stream::pending())),
        };
        Ok(fragments)
    }

    fn provider_name(&self) -> &'static str {
        "mock-llm"
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Answers every text chunk with `bytes_per_chunk` bytes of audio.
pub struct MockTTS {
    journal: Arc<Journal>,
    bytes_per_chunk: usize,
    hang_after_audio: bool,
    fail_after_first: bool,
}

impl MockTTS {
    pub fn new(journal: Arc<Journal>, bytes_per_chunk: usize) -> Self {
        Self {
            journal,
            bytes_per_chunk,
            hang_after_audio: false,
            fail_after_first: false,
        }
    }

    /// Keeps the audio stream open after the text ends.
    pub fn hanging(mut self) -> Self {
        self.hang_after_audio = true;
        self
    }

    /// Drops the connection after the first chunk of audio, then keeps producing audio.
    pub fn failing(mut self) -> Self {
        self.fail_after_first = true;
        self
    }
}

#[async_trait]
impl BaseTTS for MockTTS {
    async fn connect(&mut self) -> TTSResult<()> {
        self.journal.log("tts.connect");
        Ok(())
    }

    fn synthesize(&mut self, text: TextStream) -> TTSResult<AudioChunkStream> {
        let journal = self.journal.clone();
        let size = self.bytes_per_chunk;
        let audio = text.map(move |chunk| {
            journal.log(format!("tts.text:{chunk}"));
            Ok::<_, TTSError>(Bytes::from(vec![7u8; size]))
        });
        if self.fail_after_first {
            let broken = stream::iter(vec![
                Err(TTSError::NetworkError("connection reset".to_string())),
                Ok(Bytes::from(vec![7u8; size])),
            ]);
            return Ok(Box::pin(audio.take(1).chain(broken)));
        }
        if self.hang_after_audio {
            Ok(Box::pin(audio.chain(stream::pending())))
        } else {
            Ok(Box::pin(audio))
        }
    }

    fn close(&mut self) {
        self.journal.log("tts.close");
    }

    fn provider_name(&self) -> &'static str {
        "mock-tts"
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Builds a fresh mock capability set per call.
pub struct MockCapabilities {
    pub journal: Arc<Journal>,
    pub reply: Reply,
    pub bytes_per_chunk: usize,
    pub hang_tts: bool,
    pub failing_tts: bool,
}

impl MockCapabilities {
    pub fn new(journal: Arc<Journal>, reply: Reply) -> Self {
        Self {
            journal,
            reply,
            bytes_per_chunk: 1280,
            hang_tts: false,
            failing_tts: false,
        }
    }

    pub fn session(&self) -> SessionCapabilities {
        let journal = self.journal.clone();
        let bytes_per_chunk = self.bytes_per_chunk;
        let hang_tts = self.hang_tts;
        let failing_tts = self.failing_tts;

        SessionCapabilities {
            stt: Box::new(MockSTT::new(self.journal.clone())),
            llm: Arc::new(MockLLM::new(self.journal.clone(), self.reply.clone())),
            tts: Arc::new(move || {
                let tts = MockTTS::new(journal.clone(), bytes_per_chunk);
                let tts = if hang_tts { tts.hanging() } else { tts };
                let tts = if failing_tts { tts.failing() } else { tts };
                Ok(Box::new(tts) as Box<dyn BaseTTS>)
            }),
        }
    }
}

impl CapabilityBuilder for MockCapabilities {
    fn build(&self) -> CallResult<SessionCapabilities> {
        Ok(self.session())
    }
}

// =============================================================================
// Telephony
// =============================================================================

pub struct MockSource(pub mpsc::Receiver<ChannelEvent>);

#[async_trait]
impl ChannelSource for MockSource {
    async fn recv(&mut self) -> ChannelEvent {
        self.0.recv().await.unwrap_or(ChannelEvent::Closed)
    }
}

pub struct MockSink {
    journal: Arc<Journal>,
    frames: mpsc::UnboundedSender<Bytes>,
}

#[async_trait]
impl ChannelSink for MockSink {
    async fn send_frame(&mut self, frame: Bytes) -> ChannelResult<()> {
        self.journal.log("sink.frame");
        self.frames.send(frame).map_err(|_| ChannelError::Closed)
    }

    async fn close(&mut self) {
        self.journal.log("sink.close");
    }
}

/// A connected pair of channel halves and the test's ends of them.
pub struct MockCall {
    pub source: MockSource,
    pub sink: MockSink,
    pub caller: mpsc::Sender<ChannelEvent>,
    pub frames: mpsc::UnboundedReceiver<Bytes>,
}

pub fn mock_call(journal: &Arc<Journal>) -> MockCall {
    let (caller, source) = mpsc::channel(64);
    let (frames_tx, frames) = mpsc::unbounded_channel();
    MockCall {
        source: MockSource(source),
        sink: MockSink {
            journal: journal.clone(),
            frames: frames_tx,
        },
        caller,
        frames,
    }
}
