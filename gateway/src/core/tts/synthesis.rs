//! Synthesis driver: text fragments in, fixed-size audio frames out.

use futures::stream;
use tracing::{debug, warn};

use super::base::{BoxedTTS, TTSError, TTSResult, TextStream};
use super::sentence::{chunk_sentences, skip_blank};
use crate::config::{StreamingAudioConfig, TailPolicy};
use crate::core::audio::FrameStream;

/// Drives one synthesis session for one turn.
pub struct SynthesisDriver {
    tts: BoxedTTS,
    frame_size: usize,
    tail_policy: TailPolicy,
    sentence_batching: bool,
}

impl SynthesisDriver {
    pub fn new(tts: BoxedTTS, audio: &StreamingAudioConfig, sentence_batching: bool) -> Self {
        Self {
            tts,
            frame_size: audio.frame_size(),
            tail_policy: audio.tail_policy,
            sentence_batching,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.tts.provider_name()
    }

    /// Speaks a single piece of text.
    pub async fn speak(self, text: impl Into<String>) -> TTSResult<FrameStream<TTSError>> {
        let text: TextStream = Box::pin(stream::iter([text.into()]));
        self.speak_stream(text).await
    }

    /// Speaks a live fragment stream.
    ///
    /// The vendor session is closed exactly once: here if setup fails, otherwise by the
    /// returned stream when it ends, is closed or is dropped.
    pub async fn speak_stream(self, text: TextStream) -> TTSResult<FrameStream<TTSError>> {
        let Self {
            mut tts,
            frame_size,
            tail_policy,
            sentence_batching,
        } = self;
        let provider = tts.provider_name();

        if let Err(e) = tts.connect().await {
            warn!(provider, "Synthesis connect failed: {}", e);
            tts.close();
            return Err(e);
        }

        let text = if sentence_batching {
            chunk_sentences(text)
        } else {
            skip_blank(text)
        };

        let audio = match tts.synthesize(text) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(provider, "Synthesis request failed: {}", e);
                tts.close();
                return Err(e);
            }
        };

        let preamble = tts.preamble_chunks();
        Ok(FrameStream::new(audio, frame_size)
            .skip_leading(preamble)
            .tail_policy(tail_policy)
            .on_close(move |summary| {
                debug!(
                    provider,
                    frames = summary.frames_emitted,
                    bytes_skipped = summary.bytes_skipped,
                    bytes_discarded = summary.bytes_discarded,
                    "Synthesis stream closed"
                );
                tts.close();
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::{AudioChunkStream, BaseTTS};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Probe {
        requests: Mutex<Vec<String>>,
        closes: Mutex<usize>,
    }

    /// Answers every text chunk with one chunk of `bytes_per_request` bytes.
    struct EchoTTS {
        probe: Arc<Probe>,
        bytes_per_request: usize,
        preamble: usize,
        fail_connect: bool,
    }

    #[async_trait]
    impl BaseTTS for EchoTTS {
        async fn connect(&mut self) -> TTSResult<()> {
            if self.fail_connect {
                return Err(TTSError::ConnectionFailed("refused".to_string()));
            }
            Ok(())
        }

        fn synthesize(&mut self, text: TextStream) -> TTSResult<AudioChunkStream> {
            let probe = self.probe.clone();
            let size = self.bytes_per_request;
            let header = (self.preamble > 0).then(|| Ok(Bytes::from_static(b"RIFF")));
            let body = text.map(move |chunk| {
                probe.requests.lock().push(chunk);
                Ok(Bytes::from(vec![1u8; size]))
            });
            Ok(Box::pin(stream::iter(header).chain(body)))
        }

        fn close(&mut self) {
            *self.probe.closes.lock() += 1;
        }

        fn preamble_chunks(&self) -> usize {
            self.preamble
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    fn driver(probe: &Arc<Probe>, preamble: usize, batching: bool) -> SynthesisDriver {
        let tts = EchoTTS {
            probe: probe.clone(),
            bytes_per_request: 960,
            preamble,
            fail_connect: false,
        };
        SynthesisDriver::new(Box::new(tts), &StreamingAudioConfig::default(), batching)
    }

    fn fragments(items: &[&str]) -> TextStream {
        let items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_speak_stream_batches_sentences() {
        let probe = Arc::new(Probe::default());
        let frames = driver(&probe, 0, true)
            .speak_stream(fragments(&["Hello", " there. How", " are you?"]))
            .await
            .unwrap();

        let frames: Vec<_> = frames.collect().await;

        assert_eq!(
            *probe.requests.lock(),
            vec!["Hello there.".to_string(), "How are you?".to_string()]
        );
        // 2 x 960 bytes -> 3 frames of 640
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.as_ref().unwrap().len() == 640));
        assert_eq!(*probe.closes.lock(), 1);
    }

    #[tokio::test]
    async fn test_preamble_is_stripped() {
        let probe = Arc::new(Probe::default());
        let mut frames = driver(&probe, 1, false).speak("Hi").await.unwrap();

        let first = frames.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 640);
        assert!(first.iter().all(|b| *b == 1));
        assert!(frames.next().await.is_none());
        assert_eq!(frames.summary().bytes_skipped, 4);
    }

    #[tokio::test]
    async fn test_dropped_stream_closes_session_once() {
        let probe = Arc::new(Probe::default());
        let mut frames = driver(&probe, 0, false)
            .speak_stream(fragments(&["one", "two", "three"]))
            .await
            .unwrap();

        frames.next().await.unwrap().unwrap();
        drop(frames);

        assert_eq!(*probe.closes.lock(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_closes_session() {
        let probe = Arc::new(Probe::default());
        let tts = EchoTTS {
            probe: probe.clone(),
            bytes_per_request: 640,
            preamble: 0,
            fail_connect: true,
        };
        let driver =
            SynthesisDriver::new(Box::new(tts), &StreamingAudioConfig::default(), true);

        assert!(matches!(
            driver.speak("Hi").await,
            Err(TTSError::ConnectionFailed(_))
        ));
        assert_eq!(*probe.closes.lock(), 1);
        assert!(probe.requests.lock().is_empty());
    }
}
