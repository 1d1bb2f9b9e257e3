//! Splits a streamed WAV response into its header and its samples.

use bytes::{Bytes, BytesMut};

/// Headers larger than this are not WAV headers worth waiting for.
const MAX_HEADER_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WavChunk {
    /// Everything up to and including the `data` chunk header
    Header(Bytes),
    Samples(Bytes),
}

enum HeaderScan {
    Complete(usize),
    Incomplete,
    NotWav,
}

/// Incremental header detector for one response body.
///
/// Bytes are held back until the `data` chunk header has been seen; after that every
/// chunk passes through untouched. A body that does not start with `RIFF....WAVE` is
/// passed through as samples.
#[derive(Debug, Default)]
pub struct WavHeaderSplitter {
    pending: BytesMut,
    passthrough: bool,
}

impl WavHeaderSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: Bytes) -> Vec<WavChunk> {
        if self.passthrough {
            return if chunk.is_empty() {
                Vec::new()
            } else {
                vec![WavChunk::Samples(chunk)]
            };
        }

        self.pending.extend_from_slice(&chunk);
        match scan(&self.pending) {
            HeaderScan::Complete(len) => {
                self.passthrough = true;
                let header = self.pending.split_to(len).freeze();
                let samples = std::mem::take(&mut self.pending).freeze();
                let mut out = vec![WavChunk::Header(header)];
                if !samples.is_empty() {
                    out.push(WavChunk::Samples(samples));
                }
                out
            }
            HeaderScan::Incomplete if self.pending.len() <= MAX_HEADER_LEN => Vec::new(),
            HeaderScan::Incomplete | HeaderScan::NotWav => {
                self.passthrough = true;
                let samples = std::mem::take(&mut self.pending).freeze();
                if samples.is_empty() {
                    Vec::new()
                } else {
                    vec![WavChunk::Samples(samples)]
                }
            }
        }
    }

    /// Ends the body; returns how many bytes of an unfinished header were dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

fn scan(buf: &[u8]) -> HeaderScan {
    if buf.len() < 12 {
        let probe = &buf[..buf.len().min(4)];
        return if b"RIFF".starts_with(probe) {
            HeaderScan::Incomplete
        } else {
            HeaderScan::NotWav
        };
    }
    if &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" {
        return HeaderScan::NotWav;
    }

    let mut offset = 12;
    while offset + 8 <= buf.len() {
        let id = &buf[offset..offset + 4];
        let size = u32::from_le_bytes([
            buf[offset + 4],
            buf[offset + 5],
            buf[offset + 6],
            buf[offset + 7],
        ]) as usize;
        if id == b"data" {
            return HeaderScan::Complete(offset + 8);
        }
        // chunks are word aligned
        offset = offset.saturating_add(8 + size + (size & 1));
    }
    HeaderScan::Incomplete
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(b"RIFF");
        h.extend_from_slice(&u32::MAX.to_le_bytes());
        h.extend_from_slice(b"WAVE");
        h.extend_from_slice(b"fmt ");
        h.extend_from_slice(&16u32.to_le_bytes());
        h.extend_from_slice(&[0u8; 16]);
        h.extend_from_slice(b"data");
        h.extend_from_slice(&u32::MAX.to_le_bytes());
        h
    }

    #[test]
    fn test_splits_header_across_chunks() {
        let mut wav = header();
        wav.extend_from_slice(&[7u8; 10]);
        let (a, b) = wav.split_at(20);

        let mut splitter = WavHeaderSplitter::new();
        assert!(splitter.feed(Bytes::copy_from_slice(a)).is_empty());
        let out = splitter.feed(Bytes::copy_from_slice(b));

        assert_eq!(
            out,
            vec![
                WavChunk::Header(Bytes::from(header())),
                WavChunk::Samples(Bytes::from(vec![7u8; 10])),
            ]
        );
        assert_eq!(
            splitter.feed(Bytes::from_static(&[1, 2])),
            vec![WavChunk::Samples(Bytes::from_static(&[1, 2]))]
        );
        assert_eq!(splitter.finish(), 0);
    }

    #[test]
    fn test_non_wav_passes_through() {
        let mut splitter = WavHeaderSplitter::new();
        assert_eq!(
            splitter.feed(Bytes::from_static(b"\x01\x02\x03")),
            vec![WavChunk::Samples(Bytes::from_static(b"\x01\x02\x03"))]
        );
    }

    #[test]
    fn test_truncated_header_is_dropped() {
        let mut splitter = WavHeaderSplitter::new();
        assert!(splitter.feed(Bytes::from_static(b"RIFF\0\0")).is_empty());
        assert_eq!(splitter.finish(), 6);
    }
}
