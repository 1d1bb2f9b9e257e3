//! The turn-taking loop of one call.
//!
//! While LISTENING the session multiplexes three sources: the shutdown token, the
//! telephony channel and the utterance bridge. An utterance end starts a turn: the
//! listener is muted first, then the answer is generated and spoken while the channel is
//! still read (audio dropped, DTMF queued, hang-up noticed). Whatever way the turn ends,
//! transcription is resumed as a fresh session, unless the call itself is over.

use std::pin::Pin;
use std::time::{Duration, Instant};

use async_stream::stream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::CallState;
use crate::config::StreamingAudioConfig;
use crate::core::llm::{
    ConversationHistory, DEFAULT_SYSTEM_PROMPT, FragmentStream, GenerationDriver, SharedHistory,
    SharedLLM,
};
use crate::core::stt::{BoxedSTT, ReconnectionConfig, Transcription, UtteranceBridge, UtteranceSignal};
use crate::core::telephony::{
    BoxedSink, BoxedSource, ChannelError, ChannelEvent, ChannelSink, ChannelSource,
};
use crate::core::tts::{SynthesisDriver, TTSFactory, TextStream};
use crate::errors::CallError;

/// Default bound on releasing vendor sessions when a call ends.
const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub audio: StreamingAudioConfig,
    pub system_prompt: String,
    /// Group generated text into sentences before synthesis
    pub sentence_batching: bool,
    pub reconnection: ReconnectionConfig,
    /// Upper bound on hanging up and releasing transcription at close
    pub release_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            audio: StreamingAudioConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            sentence_batching: true,
            reconnection: ReconnectionConfig::default(),
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        }
    }
}

/// Vendor capabilities injected into a session.
pub struct SessionCapabilities {
    pub stt: BoxedSTT,
    pub llm: SharedLLM,
    /// Called once per spoken turn
    pub tts: TTSFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The caller hung up or the media channel failed
    HungUp,
    /// Process shutdown
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub call_id: String,
    pub turns: usize,
    pub silent_turns: usize,
    pub frames_sent: usize,
    pub duration: Duration,
    pub end_reason: EndReason,
}

/// How a spoken turn went wrong.
enum TurnFailure {
    /// A vendor capability failed; the call continues
    Capability(CallError),
    /// The media channel is gone; the call ends
    Channel(ChannelError),
}

pub struct CallSession {
    id: String,
    config: SessionConfig,
    transcription: Transcription,
    bridge: UtteranceBridge,
    generator: GenerationDriver,
    tts: TTSFactory,
    state: watch::Sender<CallState>,
    cancel: CancellationToken,
    queued_dtmf: Vec<String>,
    turns: usize,
    silent_turns: usize,
    frames_sent: usize,
}

impl CallSession {
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        capabilities: SessionCapabilities,
        cancel: CancellationToken,
    ) -> Self {
        let (transcription, bridge) =
            Transcription::new(capabilities.stt, config.reconnection.clone());
        let generator = GenerationDriver::new(
            capabilities.llm,
            ConversationHistory::shared(),
            config.system_prompt.clone(),
        );
        let (state, _) = watch::channel(CallState::Listening);

        Self {
            id: id.into(),
            config,
            transcription,
            bridge,
            generator,
            tts: capabilities.tts,
            state,
            cancel,
            queued_dtmf: Vec::new(),
            turns: 0,
            silent_turns: 0,
            frames_sent: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Watches state transitions.
    pub fn state(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> SharedHistory {
        self.generator.history().clone()
    }

    /// Runs the call until hang-up or shutdown.
    pub async fn run(mut self, mut source: BoxedSource, mut sink: BoxedSink) -> SessionSummary {
        let started = Instant::now();
        info!(
            stt = self.transcription.provider_name(),
            frame_size = self.config.audio.frame_size(),
            "Call session started"
        );

        match self.cancel.run_until_cancelled(self.transcription.start()).await {
            None => return self.close(sink.as_mut(), EndReason::Shutdown, started).await,
            Some(Err(e)) => warn!("Transcription failed to start, retrying on audio: {}", e),
            Some(Ok(())) => {}
        }

        let reason = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break EndReason::Shutdown,

                event = source.recv() => match event {
                    ChannelEvent::Audio(audio) => self.ingest(audio).await,
                    ChannelEvent::Dtmf(digit) => self.append_user_text(&digit),
                    ChannelEvent::Closed => break EndReason::HungUp,
                },

                // The transcription handle owns an event sender for the whole call
                Some(signal) = self.bridge.next() => match signal {
                    UtteranceSignal::TextAppend(text) => self.append_user_text(&text),
                    UtteranceSignal::UtteranceEnd => {
                        if let Some(reason) = self.take_turn(source.as_mut(), sink.as_mut()).await {
                            break reason;
                        }
                    }
                },
            }
        };

        self.close(sink.as_mut(), reason, started).await
    }

    async fn ingest(&mut self, audio: bytes::Bytes) {
        if *self.state.borrow() != CallState::Listening {
            return;
        }
        if let Some(Err(e)) = self
            .cancel
            .run_until_cancelled(self.transcription.send(audio))
            .await
        {
            debug!("Audio not transcribed: {}", e);
        }
    }

    fn append_user_text(&mut self, text: &str) {
        if let Err(e) = self.generator.append(text) {
            warn!("User text not recorded: {}", e);
        }
    }

    fn set_state(&self, state: CallState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Call state changed");
        }
    }

    /// Runs one turn. Returns `Some` when the call ended during it.
    async fn take_turn(
        &mut self,
        source: &mut dyn ChannelSource,
        sink: &mut dyn ChannelSink,
    ) -> Option<EndReason> {
        self.set_state(CallState::Generating);
        match self.cancel.run_until_cancelled(self.transcription.pause()).await {
            None => return Some(EndReason::Shutdown),
            Some(Err(e)) => warn!("Transcription pause failed: {}", e),
            Some(Ok(())) => {}
        }
        self.turns += 1;

        if self.generator.has_pending_input() {
            let mut frames = 0usize;
            let outcome = {
                let turn = speak_turn(
                    &self.generator,
                    &self.tts,
                    &self.config,
                    &self.state,
                    sink,
                    &mut frames,
                );
                tokio::pin!(turn);

                loop {
                    tokio::select! {
                        biased;

                        _ = self.cancel.cancelled() => break Err(EndReason::Shutdown),

                        event = source.recv() => match event {
                            ChannelEvent::Audio(_) => {}
                            ChannelEvent::Dtmf(digit) => self.queued_dtmf.push(digit),
                            ChannelEvent::Closed => break Err(EndReason::HungUp),
                        },

                        result = &mut turn => break Ok(result),
                    }
                }
            };
            self.frames_sent += frames;

            match outcome {
                Err(reason) => {
                    info!(frames, "Turn interrupted: {:?}", reason);
                    return Some(reason);
                }
                Ok(Err(TurnFailure::Channel(e))) => {
                    warn!(frames, "Media channel lost mid-turn: {}", e);
                    return Some(EndReason::HungUp);
                }
                Ok(Err(TurnFailure::Capability(e))) => {
                    warn!(frames, "Turn failed, returning to listening: {}", e);
                }
                Ok(Ok(())) => debug!(frames, "Turn complete"),
            }
        } else {
            self.silent_turns += 1;
            debug!("Utterance ended without text, skipping generation");
        }

        match self.cancel.run_until_cancelled(self.transcription.resume()).await {
            None => return Some(EndReason::Shutdown),
            Some(Err(e)) => warn!("Transcription resume failed, retrying on audio: {}", e),
            Some(Ok(())) => {}
        }
        self.set_state(CallState::Listening);

        for digit in std::mem::take(&mut self.queued_dtmf) {
            self.append_user_text(&digit);
        }
        None
    }

    async fn close(
        mut self,
        sink: &mut dyn ChannelSink,
        reason: EndReason,
        started: Instant,
    ) -> SessionSummary {
        self.set_state(CallState::Closed);
        let release = self.config.release_timeout;

        if timeout(release, sink.close()).await.is_err() {
            warn!("Timed out closing media channel");
        }
        match timeout(release, self.transcription.shutdown()).await {
            Ok(Err(e)) => debug!("Transcription release failed: {}", e),
            Err(_) => warn!("Timed out releasing transcription"),
            Ok(Ok(())) => {}
        }

        let summary = SessionSummary {
            call_id: self.id.clone(),
            turns: self.turns,
            silent_turns: self.silent_turns,
            frames_sent: self.frames_sent,
            duration: started.elapsed(),
            end_reason: reason,
        };
        info!(
            turns = summary.turns,
            silent_turns = summary.silent_turns,
            frames_sent = summary.frames_sent,
            duration_ms = summary.duration.as_millis() as u64,
            reason = ?summary.end_reason,
            "Call session ended"
        );
        summary
    }
}

/// Generates the answer and streams its audio to the caller.
async fn speak_turn(
    generator: &GenerationDriver,
    tts: &TTSFactory,
    config: &SessionConfig,
    state: &watch::Sender<CallState>,
    sink: &mut dyn ChannelSink,
    frames_sent: &mut usize,
) -> Result<(), TurnFailure> {
    let fragments = generator
        .generate(None)
        .await
        .map_err(|e| TurnFailure::Capability(e.into()))?;

    let mut text = text_until_error(fragments).peekable();
    if Pin::new(&mut text).peek().await.is_none() {
        debug!("Generation produced no text");
        return Ok(());
    }

    let provider = tts().map_err(|e| TurnFailure::Capability(e.into()))?;
    let mut frames = SynthesisDriver::new(provider, &config.audio, config.sentence_batching)
        .speak_stream(Box::pin(text))
        .await
        .map_err(|e| TurnFailure::Capability(e.into()))?;

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => return Err(TurnFailure::Capability(e.into())),
        };
        if *frames_sent == 0 {
            state.send_replace(CallState::Speaking);
            debug!(from = %CallState::Generating, to = %CallState::Speaking, "Call state changed");
        }
        sink.send_frame(frame).await.map_err(TurnFailure::Channel)?;
        *frames_sent += 1;
    }
    Ok(())
}

/// Generated text up to the first generation error, which is logged.
fn text_until_error(mut fragments: FragmentStream) -> TextStream {
    Box::pin(stream! {
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => yield text,
                Err(e) => {
                    warn!("Generation failed mid-answer: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::{BaseLLM, ChatMessage, LLMResult, Speaker};
    use crate::core::stt::{BaseSTT, STTResult, TranscriptionEvent, TranscriptionEventSender};
    use crate::core::telephony::ChannelResult;
    use crate::core::tts::{AudioChunkStream, BaseTTS, TTSResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
        events: Mutex<Option<TranscriptionEventSender>>,
    }

    impl Journal {
        fn log(&self, entry: impl Into<String>) {
            self.entries.lock().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.entries.lock().iter().filter(|e| e.starts_with(prefix)).count()
        }

        async fn emit(&self, event: TranscriptionEvent) {
            let sender = self.events.lock().clone();
            if let Some(sender) = sender {
                sender.send(event).await.unwrap();
            }
        }
    }

    struct JournalSTT {
        journal: Arc<Journal>,
        ready: bool,
    }

    #[async_trait]
    impl BaseSTT for JournalSTT {
        async fn connect(&mut self, generation: u64, events: TranscriptionEventSender) -> STTResult<()> {
            self.journal.log(format!("stt.connect:{generation}"));
            *self.journal.events.lock() = Some(events);
            self.ready = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> STTResult<()> {
            self.journal.log("stt.disconnect");
            self.ready = false;
            Ok(())
        }

        async fn send_audio(&mut self, _audio: Bytes) -> STTResult<()> {
            self.journal.log("stt.audio");
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn provider_name(&self) -> &'static str {
            "journal"
        }
    }

    struct EchoLLM;

    #[async_trait]
    impl BaseLLM for EchoLLM {
        async fn stream_chat(&self, messages: Vec<ChatMessage>) -> LLMResult<FragmentStream> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let items = vec![Ok("You said ".to_string()), Ok(format!("{last}."))];
            Ok(Box::pin(stream::iter(items)))
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    /// Answers each text chunk with `frames` frames; never ends when `endless`.
    struct ToneTTS {
        journal: Arc<Journal>,
        frames: usize,
        endless: bool,
    }

    #[async_trait]
    impl BaseTTS for ToneTTS {
        async fn connect(&mut self) -> TTSResult<()> {
            Ok(())
        }

        fn synthesize(&mut self, text: TextStream) -> TTSResult<AudioChunkStream> {
            let frames = self.frames;
            let audio = text.flat_map(move |_| {
                stream::iter((0..frames).map(|_| Ok(Bytes::from(vec![0u8; 640]))))
            });
            if self.endless {
                Ok(Box::pin(audio.chain(stream::pending())))
            } else {
                Ok(Box::pin(audio))
            }
        }

        fn close(&mut self) {
            self.journal.log("tts.close");
        }

        fn provider_name(&self) -> &'static str {
            "tone"
        }
    }

    struct TestSource(mpsc::Receiver<ChannelEvent>);

    #[async_trait]
    impl ChannelSource for TestSource {
        async fn recv(&mut self) -> ChannelEvent {
            self.0.recv().await.unwrap_or(ChannelEvent::Closed)
        }
    }

    struct TestSink {
        journal: Arc<Journal>,
        frames: mpsc::UnboundedSender<Bytes>,
    }

    #[async_trait]
    impl ChannelSink for TestSink {
        async fn send_frame(&mut self, frame: Bytes) -> ChannelResult<()> {
            self.frames.send(frame).map_err(|_| ChannelError::Closed)
        }

        async fn close(&mut self) {
            self.journal.log("sink.close");
        }
    }

    struct Harness {
        journal: Arc<Journal>,
        events: mpsc::Sender<ChannelEvent>,
        frames: mpsc::UnboundedReceiver<Bytes>,
        state: watch::Receiver<CallState>,
        history: SharedHistory,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<SessionSummary>,
    }

    fn start(tts_frames: usize, endless: bool) -> Harness {
        let journal = Arc::new(Journal::default());
        let tts_journal = journal.clone();
        let capabilities = SessionCapabilities {
            stt: Box::new(JournalSTT {
                journal: journal.clone(),
                ready: false,
            }),
            llm: Arc::new(EchoLLM),
            tts: Arc::new(move || {
                Ok(Box::new(ToneTTS {
                    journal: tts_journal.clone(),
                    frames: tts_frames,
                    endless,
                }) as Box<dyn BaseTTS>)
            }),
        };
        let cancel = CancellationToken::new();
        let session = CallSession::new("call-1", SessionConfig::default(), capabilities, cancel.clone());
        let state = session.state();
        let history = session.history();

        let (events_tx, events_rx) = mpsc::channel(16);
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let sink = TestSink {
            journal: journal.clone(),
            frames: frames_tx,
        };
        let task = tokio::spawn(session.run(Box::new(TestSource(events_rx)), Box::new(sink)));

        Harness {
            journal,
            events: events_tx,
            frames: frames_rx,
            state,
            history,
            cancel,
            task,
        }
    }

    async fn wait_for(state: &mut watch::Receiver<CallState>, wanted: CallState) {
        timeout(Duration::from_secs(5), state.wait_for(|s| *s == wanted))
            .await
            .expect("state not reached")
            .unwrap();
    }

    async fn wait_connected(journal: &Journal, count: usize) {
        timeout(Duration::from_secs(5), async {
            while journal.count("stt.connect") < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transcription not connected");
    }

    #[tokio::test]
    async fn test_turn_speaks_and_resumes_fresh_session() {
        let mut h = start(2, false);
        wait_connected(&h.journal, 1).await;

        h.journal.emit(TranscriptionEvent::transcript(1, "pancakes", true)).await;
        h.journal.emit(TranscriptionEvent::utterance_end(1)).await;

        wait_connected(&h.journal, 2).await;
        wait_for(&mut h.state, CallState::Listening).await;

        let mut received = 0;
        while let Ok(frame) = h.frames.try_recv() {
            assert_eq!(frame.len(), 640);
            received += 1;
        }
        // one sentence -> one synthesis request -> two frames
        assert_eq!(received, 2);

        let entries = h.journal.entries();
        let pause = entries.iter().position(|e| e == "stt.disconnect").unwrap();
        let resume = entries.iter().position(|e| e == "stt.connect:2").unwrap();
        assert!(pause < resume);
        assert_eq!(h.journal.count("tts.close"), 1);

        {
            let history = h.history.lock();
            let turns = history.closed_turns();
            assert_eq!(turns.len(), 2);
            assert_eq!(turns[1].text, "You said pancakes.");
        }

        h.events.send(ChannelEvent::Closed).await.unwrap();
        let summary = h.task.await.unwrap();
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.frames_sent, 2);
        assert_eq!(summary.end_reason, EndReason::HungUp);
    }

    #[tokio::test]
    async fn test_silent_turn_cycles_pause_and_resume() {
        let mut h = start(1, false);
        wait_connected(&h.journal, 1).await;

        h.journal.emit(TranscriptionEvent::utterance_end(1)).await;
        wait_connected(&h.journal, 2).await;
        wait_for(&mut h.state, CallState::Listening).await;

        assert!(h.history.lock().is_empty());
        assert_eq!(h.journal.count("tts.close"), 0);

        h.cancel.cancel();
        let summary = h.task.await.unwrap();
        assert_eq!(summary.silent_turns, 1);
        assert_eq!(summary.end_reason, EndReason::Shutdown);
    }

    #[tokio::test]
    async fn test_hang_up_while_speaking_never_resumes() {
        let mut h = start(1, true);
        wait_connected(&h.journal, 1).await;

        h.journal.emit(TranscriptionEvent::transcript(1, "hello", true)).await;
        h.journal.emit(TranscriptionEvent::utterance_end(1)).await;
        wait_for(&mut h.state, CallState::Speaking).await;

        h.events.send(ChannelEvent::Closed).await.unwrap();
        let summary = h.task.await.unwrap();

        assert_eq!(*h.state.borrow(), CallState::Closed);
        assert_eq!(summary.end_reason, EndReason::HungUp);
        assert_eq!(h.journal.count("stt.connect"), 1);
        assert_eq!(h.journal.count("tts.close"), 1);
        assert_eq!(h.journal.count("sink.close"), 1);
    }

    #[tokio::test]
    async fn test_dtmf_mid_turn_is_queued() {
        let mut h = start(1, true);
        wait_connected(&h.journal, 1).await;

        h.journal.emit(TranscriptionEvent::transcript(1, "press", true)).await;
        h.journal.emit(TranscriptionEvent::utterance_end(1)).await;
        wait_for(&mut h.state, CallState::Speaking).await;

        h.events.send(ChannelEvent::Dtmf("5".to_string())).await.unwrap();
        h.events.send(ChannelEvent::Audio(Bytes::from_static(&[0; 640]))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!h.history.lock().has_pending(Speaker::User));
        assert_eq!(h.journal.count("stt.audio"), 0);

        h.cancel.cancel();
        let summary = h.task.await.unwrap();
        assert_eq!(summary.end_reason, EndReason::Shutdown);
    }
}
