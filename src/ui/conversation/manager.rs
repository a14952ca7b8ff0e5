use crate::config::Config;
use crate::orchestrator::{AnswerOrchestrator, DropReason, PendingAnswer};
use crate::store::SessionState;
use crate::ui::conversation::{
    get_help_text, ComposerResult, ConversationComposer, HistoryView, ParsedCommand, SlashCommand,
    StatusLine,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Actions that can be requested by the conversation manager
#[derive(Debug)]
pub enum ConversationAction {
    None,
    /// A question was accepted; send it
    Dispatch(PendingAnswer),
    Exit,
}

/// Routes terminal input to the orchestrator and lays out the chat screen
pub struct ConversationManager {
    composer: ConversationComposer,
    assistant_name: String,
    suggestions: Vec<String>,
    show_suggestions: bool,
    notice: Option<String>,
}

impl ConversationManager {
    pub fn new(config: &Config) -> Self {
        Self {
            composer: ConversationComposer::new("Type your message... (/help for commands)"),
            assistant_name: config.ui.assistant_name.clone(),
            suggestions: config.suggestions.clone(),
            show_suggestions: config.ui.show_suggestions,
            notice: None,
        }
    }

    /// Handle key input
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        orchestrator: &mut AnswerOrchestrator,
    ) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ConversationAction::Exit;
        }

        if key.code == KeyCode::Esc {
            if self.composer.is_palette_open() {
                self.composer.close_command_palette();
                return ConversationAction::None;
            }
            return ConversationAction::Exit;
        }

        // Input is disabled while an answer is outstanding; only a submit
        // attempt gets through so it can be dropped.
        if orchestrator.is_pending() {
            if key.code == KeyCode::Enter {
                let draft = orchestrator.draft().to_string();
                return self.submit(&draft, orchestrator);
            }
            return ConversationAction::None;
        }

        match self.composer.handle_key(key, orchestrator.draft_mut()) {
            ComposerResult::Submitted(text) => self.submit(&text, orchestrator),
            ComposerResult::Command(command) => self.handle_slash_command(command, orchestrator),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Insert pasted text unless input is disabled
    pub fn handle_paste(&mut self, text: &str, orchestrator: &mut AnswerOrchestrator) {
        if orchestrator.is_pending() {
            return;
        }
        self.composer.insert_str(orchestrator.draft_mut(), text);
    }

    fn submit(&mut self, text: &str, orchestrator: &mut AnswerOrchestrator) -> ConversationAction {
        match orchestrator.begin(text) {
            Ok(ticket) => {
                self.notice = None;
                self.composer.move_to_end(orchestrator.draft());
                ConversationAction::Dispatch(ticket)
            }
            Err(DropReason::Pending) => {
                self.notice = Some("Still waiting for the previous answer.".to_string());
                ConversationAction::None
            }
            Err(DropReason::Blank) => ConversationAction::None,
        }
    }

    /// Handle slash commands
    fn handle_slash_command(
        &mut self,
        command: ParsedCommand,
        orchestrator: &mut AnswerOrchestrator,
    ) -> ConversationAction {
        match command.command {
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
            }
            SlashCommand::Suggest => {
                match command
                    .suggestion_target()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| self.suggestions.get(index))
                {
                    Some(suggestion) => {
                        orchestrator.set_draft(suggestion.clone());
                        self.composer.move_to_end(orchestrator.draft());
                        self.notice = None;
                    }
                    None => {
                        self.notice = Some(format!(
                            "Use /suggest <1-{}> to pick a suggestion",
                            self.suggestions.len()
                        ));
                    }
                }
            }
            SlashCommand::Bye => return ConversationAction::Exit,
        }
        ConversationAction::None
    }

    /// Render the chat screen for a session snapshot
    pub fn render(&self, state: &SessionState, area: Rect, buf: &mut Buffer) {
        let suggestion_height = if self.show_suggestions && !self.suggestions.is_empty() {
            1
        } else {
            0
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),                    // History
                Constraint::Length(1),                 // Status
                Constraint::Length(suggestion_height), // Suggestions
                Constraint::Length(3),                 // Composer
            ])
            .split(area);

        let pending = state.pending;

        HistoryView::new(&state.transcript, &self.assistant_name).render(chunks[0], buf);
        StatusLine::new(pending, &self.assistant_name, self.notice.as_deref())
            .render(chunks[1], buf);

        if suggestion_height > 0 {
            let mut spans = vec![Span::styled("Suggestions: ", Style::default().fg(Color::Gray))];
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                spans.push(Span::styled(
                    format!("[{}] {}  ", i + 1, suggestion),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            buf.set_line(chunks[2].x, chunks[2].y, &Line::from(spans), chunks[2].width);
        }

        self.composer
            .view(&state.draft_input, pending)
            .render(chunks[3], buf);
    }
}
