//! Fixed-size frame adapter over an irregular byte-chunk stream.
//!
//! Synthesis vendors deliver audio in chunks of whatever size their transport produced.
//! The telephony channel wants exact frames. [`FrameStream`] sits between the two:
//!
//! ```text
//! chunks: [3][3][7][1][12] ──▶ skip preamble ──▶ BytesMut ──▶ frames: [F][F][F]...
//! ```
//!
//! The close hook registered with [`FrameStream::on_close`] runs exactly once, whether the
//! stream ends normally, yields an error, is closed explicitly or is dropped mid-way.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::config::TailPolicy;

/// Byte accounting reported to the close hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameBufferSummary {
    pub chunks_skipped: usize,
    pub bytes_skipped: usize,
    pub frames_emitted: usize,
    pub bytes_emitted: usize,
    /// Partial-frame bytes dropped at end of stream, on error or on close
    pub bytes_discarded: usize,
    /// Zero bytes appended to complete the last frame under [`TailPolicy::Pad`]
    pub bytes_padded: usize,
}

impl FrameBufferSummary {
    /// Total upstream bytes that reached the buffer (after the preamble was stripped).
    pub fn bytes_accumulated(&self) -> usize {
        self.bytes_emitted + self.bytes_discarded - self.bytes_padded
    }
}

/// Callback fired once when the frame stream finishes.
pub type CloseHook = Box<dyn FnOnce(FrameBufferSummary) + Send>;

/// A `Stream` of exactly `frame_size`-byte frames built from an upstream chunk stream.
pub struct FrameStream<E> {
    upstream: Option<BoxStream<'static, Result<Bytes, E>>>,
    frame_size: usize,
    skip_remaining: usize,
    tail_policy: TailPolicy,
    buffer: BytesMut,
    summary: FrameBufferSummary,
    on_close: Option<CloseHook>,
}

impl<E> FrameStream<E> {
    /// Wraps `upstream`, emitting frames of `frame_size` bytes.
    ///
    /// # Panics
    /// If `frame_size` is zero. Callers take it from
    /// [`StreamingAudioConfig::frame_size`](crate::config::StreamingAudioConfig::frame_size),
    /// which is never zero.
    pub fn new(upstream: BoxStream<'static, Result<Bytes, E>>, frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be non-zero");
        Self {
            upstream: Some(upstream),
            frame_size,
            skip_remaining: 0,
            tail_policy: TailPolicy::default(),
            buffer: BytesMut::with_capacity(frame_size * 2),
            summary: FrameBufferSummary::default(),
            on_close: None,
        }
    }

    /// Drops the first `count` upstream chunks (vendor container headers).
    pub fn skip_leading(mut self, count: usize) -> Self {
        self.skip_remaining = count;
        self
    }

    pub fn tail_policy(mut self, tail_policy: TailPolicy) -> Self {
        self.tail_policy = tail_policy;
        self
    }

    pub fn on_close(mut self, hook: impl FnOnce(FrameBufferSummary) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Snapshot of the accounting so far.
    pub fn summary(&self) -> FrameBufferSummary {
        self.summary
    }

    pub fn is_closed(&self) -> bool {
        self.upstream.is_none() && self.on_close.is_none()
    }

    /// Ends the stream early: releases upstream, drops buffered bytes and fires the hook.
    pub fn close(&mut self) {
        self.upstream = None;
        self.discard_buffer();
        self.finish();
    }

    fn discard_buffer(&mut self) {
        self.summary.bytes_discarded += self.buffer.len();
        self.buffer.clear();
    }

    fn finish(&mut self) {
        if let Some(hook) = self.on_close.take() {
            debug!(
                frames = self.summary.frames_emitted,
                discarded = self.summary.bytes_discarded,
                "Frame stream closed"
            );
            hook(self.summary);
        }
    }

    fn take_frame(&mut self) -> Bytes {
        let frame = self.buffer.split_to(self.frame_size).freeze();
        self.summary.frames_emitted += 1;
        self.summary.bytes_emitted += frame.len();
        frame
    }

    /// Applies the tail policy once upstream is exhausted.
    fn flush_tail(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }
        match self.tail_policy {
            TailPolicy::Discard => {
                self.discard_buffer();
                None
            }
            TailPolicy::Pad => {
                let padding = self.frame_size - self.buffer.len();
                self.buffer.resize(self.frame_size, 0);
                self.summary.bytes_padded += padding;
                Some(self.take_frame())
            }
        }
    }
}

impl<E> Stream for FrameStream<E> {
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.buffer.len() >= this.frame_size {
                return Poll::Ready(Some(Ok(this.take_frame())));
            }

            let Some(upstream) = this.upstream.as_mut() else {
                this.finish();
                return Poll::Ready(None);
            };

            match upstream.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    if this.skip_remaining > 0 {
                        this.skip_remaining -= 1;
                        this.summary.chunks_skipped += 1;
                        this.summary.bytes_skipped += chunk.len();
                        continue;
                    }
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.upstream = None;
                    this.discard_buffer();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.upstream = None;
                    if let Some(frame) = this.flush_tail() {
                        return Poll::Ready(Some(Ok(frame)));
                    }
                    this.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<E> Drop for FrameStream<E> {
    fn drop(&mut self) {
        if self.on_close.is_some() {
            self.upstream = None;
            self.discard_buffer();
            self.finish();
        }
    }
}
