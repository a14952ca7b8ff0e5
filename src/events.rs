use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::AnswerError;
use crate::orchestrator::PendingAnswer;

/// Internal application events for coordinating between components
#[derive(Debug)]
pub enum AppEvent {
    /// The answering service call for `ticket` finished
    AnswerSettled {
        ticket: PendingAnswer,
        outcome: Result<String, AnswerError>,
    },

    /// Terminal input
    Tui(TuiEvent),
}

/// TUI-specific events (keyboard, paste, resize)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Draw/redraw request
    Draw,
}

impl TuiEvent {
    /// Map a raw crossterm event, dropping the kinds the chat view ignores.
    pub fn from_crossterm(event: crossterm::event::Event) -> Option<Self> {
        use crossterm::event::Event;

        match event {
            Event::Key(key) => Some(TuiEvent::Key(key)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(w, h) => Some(TuiEvent::Resize(w, h)),
            Event::FocusGained => Some(TuiEvent::Draw),
            _ => None,
        }
    }
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Sender {
    /// Label shown above a message; the assistant goes by its configured name
    pub fn display_name<'a>(&self, assistant_name: &'a str) -> &'a str {
        match self {
            Sender::User => "You",
            Sender::Assistant => assistant_name,
        }
    }
}

/// Individual transcript entry. Identity is its position in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
}

/// Field layout of a stored message
#[derive(Deserialize)]
struct MessageRecord {
    content: String,
    sender: Sender,
}

impl<'de> Deserialize<'de> for Message {
    /// Only `{"content", "sender"}` objects are messages; the positional
    /// `["text", "user"]` form serde would otherwise accept is rejected.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let record =
            MessageRecord::deserialize(Value::Object(fields)).map_err(serde::de::Error::custom)?;

        Ok(Self {
            content: record.content,
            sender: record.sender,
        })
    }
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
        }
    }
}
