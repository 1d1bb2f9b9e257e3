//! Per-call transcription handle: start, pause, resume and audio forwarding.
//!
//! `pause` closes the [`PauseGate`] before touching the vendor, so nothing queued can leak
//! through once it returns. `resume` never un-mutes the old vendor session: it moves the
//! gate to a new generation and opens a fresh one. A vendor session that drops while
//! listening is re-established lazily from `send`, with exponential backoff that never
//! blocks the caller.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::base::{BoxedSTT, STTError, STTResult, TranscriptionEventSender};
use super::bridge::{PauseGate, UtteranceBridge};

/// Capacity of the event channel between the vendor adapter and the bridge.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Reconnection Policy
// =============================================================================

/// Backoff policy for re-establishing a dropped vendor session.
///
/// The delay doubles after every failed attempt, up to `max_delay`.
#[derive(Debug, Clone)]
pub struct ReconnectionConfig {
    /// Consecutive failures tolerated before transcription gives up; 0 disables retries
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectionConfig {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Delay before the retry that follows failure number `failures` (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

// =============================================================================
// Transcription
// =============================================================================

pub struct Transcription {
    stt: BoxedSTT,
    gate: PauseGate,
    events: TranscriptionEventSender,
    reconnection: ReconnectionConfig,
    failures: u32,
    retry_at: Option<Instant>,
}

impl Transcription {
    /// Wraps a vendor provider and returns the bridge that consumes its events.
    pub fn new(stt: BoxedSTT, reconnection: ReconnectionConfig) -> (Self, UtteranceBridge) {
        let (events, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let gate = PauseGate::new();
        let bridge = UtteranceBridge::new(events_rx, gate.clone());

        let transcription = Self {
            stt,
            gate,
            events,
            reconnection,
            failures: 0,
            retry_at: None,
        };
        (transcription, bridge)
    }

    /// Opens the first vendor session.
    pub async fn start(&mut self) -> STTResult<()> {
        let generation = self.gate.generation();
        self.connect(generation).await
    }

    /// Mutes transcription. Idempotent; the gate is closed before the vendor is released.
    pub async fn pause(&mut self) -> STTResult<()> {
        if !self.gate.pause() {
            debug!("Transcription already paused");
            return Ok(());
        }
        debug!(generation = self.gate.generation(), "Transcription paused");
        self.stt.disconnect().await
    }

    /// Opens a fresh vendor session under a new generation.
    pub async fn resume(&mut self) -> STTResult<()> {
        self.gate.pause();
        if self.stt.is_ready()
            && let Err(e) = self.stt.disconnect().await
        {
            warn!("Failed to release previous transcription session: {}", e);
        }

        let generation = self.gate.advance();
        self.gate.open();
        self.failures = 0;
        self.retry_at = None;
        self.connect(generation).await
    }

    /// Forwards caller audio. Dropped silently while paused.
    pub async fn send(&mut self, audio: Bytes) -> STTResult<()> {
        if self.gate.is_paused() {
            return Ok(());
        }
        if !self.stt.is_ready() {
            self.reconnect().await?;
            if !self.stt.is_ready() {
                return Ok(());
            }
        }
        self.stt.send_audio(audio).await
    }

    /// Releases the vendor session for good.
    pub async fn shutdown(&mut self) -> STTResult<()> {
        self.gate.pause();
        self.stt.disconnect().await
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    pub fn generation(&self) -> u64 {
        self.gate.generation()
    }

    pub fn provider_name(&self) -> &'static str {
        self.stt.provider_name()
    }

    async fn connect(&mut self, generation: u64) -> STTResult<()> {
        match self.stt.connect(generation, self.events.clone()).await {
            Ok(()) => {
                info!(
                    provider = self.stt.provider_name(),
                    generation, "Transcription session opened"
                );
                self.failures = 0;
                self.retry_at = None;
                Ok(())
            }
            Err(e) => {
                self.schedule_retry();
                Err(e)
            }
        }
    }

    async fn reconnect(&mut self) -> STTResult<()> {
        if !self.reconnection.should_retry(self.failures) {
            return Err(STTError::ConnectionFailed(format!(
                "Transcription unavailable after {} attempts",
                self.failures
            )));
        }
        if let Some(at) = self.retry_at
            && Instant::now() < at
        {
            return Ok(());
        }

        warn!(
            provider = self.stt.provider_name(),
            attempt = self.failures + 1,
            "Transcription session lost, reconnecting"
        );
        if let Err(e) = self.stt.disconnect().await {
            debug!("Disconnect before reconnect failed: {}", e);
        }
        let generation = self.gate.advance();
        self.connect(generation).await
    }

    fn schedule_retry(&mut self) {
        self.failures += 1;
        self.retry_at = Some(Instant::now() + self.reconnection.delay_after(self.failures));
    }
}
