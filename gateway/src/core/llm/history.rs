//! Conversation history: closed turns plus at most one open, append-only turn.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "User"),
            Speaker::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Cannot append to a {requested} turn while a {open} turn is open")]
    SpeakerMismatch { open: Speaker, requested: Speaker },
}

/// History shared between the ingest path and the generation driver.
pub type SharedHistory = Arc<Mutex<ConversationHistory>>;

#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    closed: Vec<Turn>,
    open: Option<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedHistory {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn closed_turns(&self) -> &[Turn] {
        &self.closed
    }

    pub fn open_turn(&self) -> Option<&Turn> {
        self.open.as_ref()
    }

    /// True when a turn by `speaker` is open and holds non-blank text.
    pub fn has_pending(&self, speaker: Speaker) -> bool {
        self.open
            .as_ref()
            .is_some_and(|turn| turn.speaker == speaker && !turn.text.trim().is_empty())
    }

    /// Appends raw text to the open turn, opening one for `speaker` if none is open.
    pub fn append(&mut self, speaker: Speaker, fragment: &str) -> Result<(), HistoryError> {
        let turn = self.open_for(speaker)?;
        turn.text.push_str(fragment);
        Ok(())
    }

    /// Like [`append`](Self::append), but inserts a single space at the seam when
    /// neither side already has whitespace there.
    pub fn append_words(&mut self, speaker: Speaker, words: &str) -> Result<(), HistoryError> {
        let turn = self.open_for(speaker)?;
        let needs_space = !turn.text.is_empty()
            && !turn.text.ends_with(char::is_whitespace)
            && !words.starts_with(char::is_whitespace);
        if needs_space {
            turn.text.push(' ');
        }
        turn.text.push_str(words);
        Ok(())
    }

    /// Closes the open turn, if any, and returns a copy of it.
    pub fn close(&mut self) -> Option<Turn> {
        let turn = self.open.take()?;
        self.closed.push(turn.clone());
        Some(turn)
    }

    /// Closes the open turn only when it belongs to `speaker`.
    pub fn close_if(&mut self, speaker: Speaker) -> Option<Turn> {
        let owned = self.open.as_ref().is_some_and(|turn| turn.speaker == speaker);
        if owned { self.close() } else { None }
    }

    /// Drops the open turn without recording it.
    pub fn discard_open(&mut self) -> Option<Turn> {
        self.open.take()
    }

    /// Records an already-complete turn. Any open turn is closed first.
    pub fn push_closed(&mut self, turn: Turn) {
        self.close();
        self.closed.push(turn);
    }

    /// One line per closed turn, `Speaker: text`.
    pub fn render(&self) -> String {
        self.closed
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.open.is_none()
    }

    fn open_for(&mut self, speaker: Speaker) -> Result<&mut Turn, HistoryError> {
        if let Some(turn) = &self.open
            && turn.speaker != speaker
        {
            return Err(HistoryError::SpeakerMismatch {
                open: turn.speaker,
                requested: speaker,
            });
        }
        Ok(self
            .open
            .get_or_insert_with(|| Turn::new(speaker, String::new())))
    }
}
