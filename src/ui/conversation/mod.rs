//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::HistoryView;
pub use indicator::StatusLine;
pub use manager::{ConversationAction, ConversationManager};
