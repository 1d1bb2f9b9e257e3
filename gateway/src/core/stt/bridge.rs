//! Utterance bridge: raw transcription events in, two clean signals out.
//!
//! The bridge is the only consumer of a call's transcription event channel. It forwards
//! final, non-empty text as [`UtteranceSignal::TextAppend`] and endpoint detections as
//! [`UtteranceSignal::UtteranceEnd`]. Everything else is dropped here, including any
//! event that arrives while the owning session is paused and any event from a vendor
//! session that has since been replaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::base::{TranscriptionEvent, TranscriptionEventKind};

// =============================================================================
// PauseGate
// =============================================================================

#[derive(Debug)]
struct GateState {
    paused: AtomicBool,
    generation: AtomicU64,
}

/// Shared mute switch between a transcription handle and its bridge.
///
/// Checked on every event, so events already queued when a pause lands are suppressed too.
#[derive(Debug, Clone)]
pub struct PauseGate {
    inner: Arc<GateState>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    /// Starts unpaused at generation 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateState {
                paused: AtomicBool::new(false),
                generation: AtomicU64::new(1),
            }),
        }
    }

    /// Closes the gate. Returns false when it was already closed.
    pub fn pause(&self) -> bool {
        !self.inner.paused.swap(true, Ordering::AcqRel)
    }

    /// Moves to a new generation while staying closed. Returns the new generation.
    pub fn advance(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Opens the gate for the current generation.
    pub fn open(&self) {
        self.inner.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// True when an event from `generation` may be forwarded right now.
    pub fn admits(&self, generation: u64) -> bool {
        !self.is_paused() && generation == self.generation()
    }
}

// =============================================================================
// UtteranceBridge
// =============================================================================

/// Signals forwarded to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceSignal {
    /// Final recognized text to append to the pending user turn
    TextAppend(String),
    /// The user finished speaking, with or without recognized text
    UtteranceEnd,
}

pub struct UtteranceBridge {
    events: mpsc::Receiver<TranscriptionEvent>,
    gate: PauseGate,
}

impl UtteranceBridge {
    pub fn new(events: mpsc::Receiver<TranscriptionEvent>, gate: PauseGate) -> Self {
        Self { events, gate }
    }

    /// Waits for the next forwardable signal.
    ///
    /// Returns `None` once every event sender is gone. Cancel safe: dropping the future
    /// never loses an admitted event.
    pub async fn next(&mut self) -> Option<UtteranceSignal> {
        while let Some(event) = self.events.recv().await {
            if let Some(signal) = self.filter(event) {
                return Some(signal);
            }
        }
        None
    }

    fn filter(&self, event: TranscriptionEvent) -> Option<UtteranceSignal> {
        if !self.gate.admits(event.generation) {
            debug!(
                generation = event.generation,
                current = self.gate.generation(),
                paused = self.gate.is_paused(),
                "Dropping transcription event"
            );
            return None;
        }

        match event.kind {
            TranscriptionEventKind::Transcript { text, is_final } => {
                let text = text.trim();
                if is_final && !text.is_empty() {
                    Some(UtteranceSignal::TextAppend(text.to_string()))
                } else {
                    None
                }
            }
            TranscriptionEventKind::UtteranceEnd => Some(UtteranceSignal::UtteranceEnd),
            TranscriptionEventKind::SpeechStarted => None,
            TranscriptionEventKind::Error(message) => {
                warn!(generation = event.generation, "Transcription vendor error: {}", message);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> (mpsc::Sender<TranscriptionEvent>, PauseGate, UtteranceBridge) {
        let (tx, rx) = mpsc::channel(16);
        let gate = PauseGate::new();
        let bridge = UtteranceBridge::new(rx, gate.clone());
        (tx, gate, bridge)
    }

    #[tokio::test]
    async fn test_only_final_non_empty_text_is_forwarded() {
        let (tx, _gate, mut bridge) = bridge();
        tx.send(TranscriptionEvent::transcript(1, "hel", false)).await.unwrap();
        tx.send(TranscriptionEvent::transcript(1, "   ", true)).await.unwrap();
        tx.send(TranscriptionEvent::transcript(1, " hello there ", true))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(
            bridge.next().await,
            Some(UtteranceSignal::TextAppend("hello there".to_string()))
        );
        assert_eq!(bridge.next().await, None);
    }

    #[tokio::test]
    async fn test_utterance_end_fires_without_text() {
        let (tx, _gate, mut bridge) = bridge();
        tx.send(TranscriptionEvent::utterance_end(1)).await.unwrap();

        assert_eq!(bridge.next().await, Some(UtteranceSignal::UtteranceEnd));
    }

    #[tokio::test]
    async fn test_queued_events_suppressed_after_pause() {
        let (tx, gate, mut bridge) = bridge();
        tx.send(TranscriptionEvent::transcript(1, "late words", true))
            .await
            .unwrap();
        tx.send(TranscriptionEvent::utterance_end(1)).await.unwrap();

        assert!(gate.pause());
        assert!(!gate.pause(), "second pause is a no-op");
        drop(tx);

        assert_eq!(bridge.next().await, None);
    }

    #[tokio::test]
    async fn test_stale_generation_dropped_after_resume() {
        let (tx, gate, mut bridge) = bridge();
        gate.pause();
        let generation = gate.advance();
        gate.open();
        assert_eq!(generation, 2);

        tx.send(TranscriptionEvent::utterance_end(1)).await.unwrap();
        tx.send(TranscriptionEvent::transcript(2, "fresh", true))
            .await
            .unwrap();

        assert_eq!(
            bridge.next().await,
            Some(UtteranceSignal::TextAppend("fresh".to_string()))
        );
    }

    #[tokio::test]
    async fn test_vendor_errors_are_dropped() {
        let (tx, _gate, mut bridge) = bridge();
        tx.send(TranscriptionEvent {
            generation: 1,
            kind: TranscriptionEventKind::Error("bad frame".to_string()),
        })
        .await
        .unwrap();
        tx.send(TranscriptionEvent::utterance_end(1)).await.unwrap();

        assert_eq!(bridge.next().await, Some(UtteranceSignal::UtteranceEnd));
    }
}
