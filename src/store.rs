//! In-memory conversation state: the transcript, the in-flight flag and the
//! draft input. No I/O happens here.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::events::Message;

/// Ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    fn push(&mut self, message: Message) {
        self.0.push(message);
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Snapshot of everything the front end renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub transcript: Transcript,
    pub pending: bool,
    pub draft_input: String,
}

/// Single source of truth for the conversation.
///
/// Every mutation is a pure append, so the transcript never shrinks and
/// entries are never reordered.
#[derive(Debug)]
pub struct ConversationStore {
    state: SessionState,
}

impl ConversationStore {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            state: SessionState {
                transcript,
                pending: false,
                draft_input: String::new(),
            },
        }
    }

    /// Append a user message. Content is stored verbatim; only whitespace-only
    /// text is rejected.
    pub fn append_user(&mut self, text: &str) -> Result<&Transcript, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.state.transcript.push(Message::user(text));
        Ok(&self.state.transcript)
    }

    /// Append an assistant message. Empty text is allowed.
    pub fn append_assistant(&mut self, text: impl Into<String>) -> &Transcript {
        self.state.transcript.push(Message::assistant(text));
        &self.state.transcript
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.state.pending = pending;
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.state.draft_input = text.into();
    }

    pub fn clear_draft(&mut self) {
        self.state.draft_input.clear();
    }

    pub fn draft(&self) -> &str {
        &self.state.draft_input
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.state.draft_input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }
}
