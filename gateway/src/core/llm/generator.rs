//! Generation driver: turns the pending user utterance into a live stream of
//! assistant text, keeping the conversation history in step.
//!
//! The model sees three messages: the system preamble, the rendered closed turns
//! prefixed with [`CONTEXT_PREFIX`], and the user utterance. The assistant turn is
//! opened just before the first fragment is yielded and closed when the stream is
//! exhausted or dropped, so an abandoned turn still lands in history with what was said.

use async_stream::stream;
use futures::{StreamExt, stream};
use tracing::{debug, warn};

use super::base::{ChatMessage, FragmentStream, LLMResult, SharedLLM};
use super::history::{HistoryError, SharedHistory, Speaker, Turn};

/// Prefix of the system message carrying the conversation so far.
pub const CONTEXT_PREFIX: &str = "Conversation Context: ";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that tries to convince \
     people that pancakes are better than waffles.";

pub struct GenerationDriver {
    llm: SharedLLM,
    history: SharedHistory,
    system_prompt: String,
}

impl GenerationDriver {
    pub fn new(llm: SharedLLM, history: SharedHistory, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            history,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Extends the pending user turn without generating anything.
    pub fn append(&self, text: &str) -> Result<(), HistoryError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.history.lock().append_words(Speaker::User, text)
    }

    /// True when a non-blank user turn is waiting to be answered.
    pub fn has_pending_input(&self) -> bool {
        self.history.lock().has_pending(Speaker::User)
    }

    /// Streams an answer.
    ///
    /// With `None` the pending user turn is consumed as input, exactly once. With
    /// `Some(text)` any pending user turn is closed as-is and `text` becomes the next
    /// user turn. Without usable input the stream is empty and no turn is opened.
    pub async fn generate(&self, utterance: Option<&str>) -> LLMResult<FragmentStream> {
        let Some((input, context)) = self.take_input(utterance) else {
            debug!("Nothing to answer, skipping generation");
            return Ok(Box::pin(stream::empty()));
        };

        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::system(format!("{CONTEXT_PREFIX}{context}")),
            ChatMessage::user(input),
        ];
        let mut upstream = self.llm.stream_chat(messages).await?;
        let history = self.history.clone();

        Ok(Box::pin(stream! {
            let mut turn = AssistantTurn::new(history);
            // Blank fragments before the first word are held back, so a blank answer
            // opens no turn and yields nothing
            let mut leading = String::new();
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        if !turn.opened && fragment.trim().is_empty() {
                            leading.push_str(&fragment);
                            continue;
                        }
                        let fragment = if leading.is_empty() {
                            fragment
                        } else {
                            std::mem::take(&mut leading) + &fragment
                        };
                        turn.push(&fragment);
                        yield Ok(fragment);
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
            turn.finish();
        }))
    }

    /// Resolves the user input and renders the context it is answered against.
    fn take_input(&self, utterance: Option<&str>) -> Option<(String, String)> {
        let mut history = self.history.lock();

        let input = match utterance {
            Some(text) => {
                history.close_if(Speaker::User);
                Some(text.to_string())
            }
            None => {
                let pending = history
                    .open_turn()
                    .is_some_and(|turn| turn.speaker == Speaker::User);
                if pending {
                    history.discard_open().map(|turn| turn.text)
                } else {
                    None
                }
            }
        };

        let input = input
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())?;
        let context = history.render();
        history.push_closed(Turn::user(input.clone()));
        Some((input, context))
    }
}

/// Assistant turn in flight. Closes itself on drop.
struct AssistantTurn {
    history: SharedHistory,
    opened: bool,
    finished: bool,
}

impl AssistantTurn {
    fn new(history: SharedHistory) -> Self {
        Self {
            history,
            opened: false,
            finished: false,
        }
    }

    fn push(&mut self, fragment: &str) {
        match self.history.lock().append(Speaker::Assistant, fragment) {
            Ok(()) => self.opened = true,
            Err(e) => warn!("Assistant fragment not recorded: {}", e),
        }
    }

    fn finish(&mut self) {
        if self.opened && !self.finished {
            self.history.lock().close_if(Speaker::Assistant);
        }
        self.finished = true;
    }
}

impl Drop for AssistantTurn {
    fn drop(&mut self) {
        self.finish();
    }
}
