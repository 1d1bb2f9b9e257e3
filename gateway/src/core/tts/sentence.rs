//! Groups streamed text fragments into sentence-sized synthesis requests.

use async_stream::stream;
use futures::StreamExt;

use super::base::TextStream;

const TERMINATORS: [char; 5] = ['.', '!', '?', ';', ':'];

/// Accumulates fragments and releases complete sentences.
///
/// A sentence ends at a newline, or at a terminator followed by whitespace. A terminator
/// at the very end of the buffer is held until the next fragment shows what follows it.
#[derive(Debug, Default)]
pub struct SentenceChunker {
    buffer: String,
}

impl SentenceChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fragment and returns every sentence it completed, never empty ones.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);

        let mut sentences = Vec::new();
        while let Some(end) = self.boundary() {
            let rest = self.buffer.split_off(end);
            let sentence = std::mem::replace(&mut self.buffer, rest);
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
        }
        sentences
    }

    /// Flushes whatever partial sentence remains.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }

    /// Byte offset just past the first sentence boundary.
    fn boundary(&self) -> Option<usize> {
        let mut chars = self.buffer.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\n' {
                return Some(i + 1);
            }
            if TERMINATORS.contains(&c)
                && let Some(&(j, next)) = chars.peek()
                && next.is_whitespace()
            {
                return Some(j + next.len_utf8());
            }
        }
        None
    }
}

/// Re-chunks a fragment stream at sentence boundaries.
pub fn chunk_sentences(mut fragments: TextStream) -> TextStream {
    Box::pin(stream! {
        let mut chunker = SentenceChunker::new();
        while let Some(fragment) = fragments.next().await {
            for sentence in chunker.push(&fragment) {
                yield sentence;
            }
        }
        if let Some(rest) = chunker.finish() {
            yield rest;
        }
    })
}

/// Passes fragments through unchanged, dropping blank ones.
pub fn skip_blank(fragments: TextStream) -> TextStream {
    Box::pin(fragments.filter(|fragment| {
        let keep = !fragment.trim().is_empty();
        async move { keep }
    }))
}
