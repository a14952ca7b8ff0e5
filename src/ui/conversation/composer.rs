use crate::ui::conversation::commands::{
    CommandEntry, ParsedCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter on a non-command draft. The draft is left in place; whoever
    /// accepts the question clears it.
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Input line editor.
///
/// The text itself lives in the conversation store's draft; the composer
/// only tracks the cursor (in characters) and the command palette.
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    cursor: usize,
    placeholder: String,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            cursor: 0,
            placeholder: placeholder.into(),
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input against `draft`
    pub fn handle_key(&mut self, key: KeyEvent, draft: &mut String) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        // The draft may have been replaced since the last key.
        self.cursor = self.cursor.min(draft.chars().count());

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char(draft, '\n');
                } else if self.show_command_palette && self.apply_selected_command(draft) {
                    return ComposerResult::None;
                } else if let Some(command) = parse_slash_command(draft) {
                    draft.clear();
                    self.cursor = 0;
                    self.close_command_palette();
                    return ComposerResult::Command(command);
                } else {
                    return ComposerResult::Submitted(draft.clone());
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command(draft);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(draft, c);
                self.sync_command_palette(draft);
            }
            KeyCode::Backspace => {
                if self.backspace(draft) {
                    self.sync_command_palette(draft);
                }
            }
            KeyCode::Delete => {
                if self.delete(draft) {
                    self.sync_command_palette(draft);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < draft.chars().count() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = draft.chars().count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, draft: &mut String, text: &str) {
        self.cursor = self.cursor.min(draft.chars().count());
        draft.insert_str(byte_index(draft, self.cursor), text);
        self.cursor += text.chars().count();
        self.sync_command_palette(draft);
    }

    /// Move the cursor to the end of `draft`, e.g. after it was replaced
    pub fn move_to_end(&mut self, draft: &str) {
        self.cursor = draft.chars().count();
        self.close_command_palette();
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    pub fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    /// Borrow the composer together with the text it edits, for rendering
    pub fn view<'a>(&'a self, draft: &'a str, disabled: bool) -> ComposerView<'a> {
        ComposerView {
            composer: self,
            draft,
            disabled,
        }
    }

    fn insert_char(&mut self, draft: &mut String, c: char) {
        draft.insert(byte_index(draft, self.cursor), c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self, draft: &mut String) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        draft.remove(byte_index(draft, self.cursor));
        true
    }

    /// Delete character at cursor
    fn delete(&mut self, draft: &mut String) -> bool {
        if self.cursor >= draft.chars().count() {
            return false;
        }
        draft.remove(byte_index(draft, self.cursor));
        true
    }

    /// Open, refresh or close the palette to match the draft
    fn sync_command_palette(&mut self, draft: &str) {
        let typing_command = draft.starts_with('/') && !draft.contains(char::is_whitespace);
        if !typing_command {
            self.close_command_palette();
            return;
        }

        if !self.show_command_palette {
            self.show_command_palette = true;
            self.selected_command = Some(0);
        }
        self.refresh_command_palette(draft);
    }

    fn refresh_command_palette(&mut self, draft: &str) {
        let query = draft.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let current = self.selected_command.unwrap_or(0) as isize;
        let len = self.filtered_commands.len() as isize;
        let next = (current + delta).rem_euclid(len);

        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self, draft: &mut String) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
            .copied()
        else {
            return false;
        };

        *draft = format!("/{} ", entry.command.command());
        self.cursor = draft.chars().count();
        self.close_command_palette();
        true
    }
}

/// Byte offset of the `chars`-th character
fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// Render-time pairing of a composer and its draft
pub struct ComposerView<'a> {
    composer: &'a ConversationComposer,
    draft: &'a str,
    disabled: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer = self.composer;

        let block = Block::default()
            .borders(Borders::ALL)
            .title(if self.disabled { "Waiting for answer..." } else { "Message" })
            .style(if self.disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Green)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.draft.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                composer.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.draft.to_string();
            if !self.disabled {
                content.insert(byte_index(&content, composer.cursor), '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner_area.height as usize {
                    let line = Line::from(vec![Span::raw(line_text)]);
                    buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
                }
            }
        }

        if composer.show_command_palette {
            let palette_height = (composer.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in composer.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if composer.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, draft: &mut String, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)), draft);
        }
    }

    #[test]
    fn test_enter_submits_without_clearing() {
        let mut composer = ConversationComposer::new("Type your message...");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "Hi there");

        let result = composer.handle_key(press(KeyCode::Enter), &mut draft);

        assert_eq!(result, ComposerResult::Submitted("Hi there".to_string()));
        assert_eq!(draft, "Hi there");
    }

    #[test]
    fn test_editing_handles_multibyte_text() {
        let mut composer = ConversationComposer::new("");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "héllo");

        composer.handle_key(press(KeyCode::Left), &mut draft);
        composer.handle_key(press(KeyCode::Left), &mut draft);
        composer.handle_key(press(KeyCode::Left), &mut draft);
        composer.handle_key(press(KeyCode::Backspace), &mut draft);
        assert_eq!(draft, "hllo");

        composer.handle_key(press(KeyCode::Home), &mut draft);
        composer.handle_key(press(KeyCode::Delete), &mut draft);
        assert_eq!(draft, "llo");

        composer.handle_key(press(KeyCode::End), &mut draft);
        composer.insert_str(&mut draft, " “ok”");
        assert_eq!(draft, "llo “ok”");
    }

    #[test]
    fn test_cursor_clamps_after_external_clear() {
        let mut composer = ConversationComposer::new("");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "question");

        draft.clear();
        composer.handle_key(press(KeyCode::Char('x')), &mut draft);

        assert_eq!(draft, "x");
    }

    #[test]
    fn test_slash_command_is_returned_and_cleared() {
        let mut composer = ConversationComposer::new("");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "/suggest 3");

        let result = composer.handle_key(press(KeyCode::Enter), &mut draft);

        match result {
            ComposerResult::Command(command) => {
                assert_eq!(command.command, SlashCommand::Suggest);
                assert_eq!(command.suggestion_target(), Some(3));
            }
            other => panic!("expected command, got {:?}", other),
        }
        assert!(draft.is_empty());
    }

    #[test]
    fn test_palette_completes_selected_command() {
        let mut composer = ConversationComposer::new("");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "/he");
        assert!(composer.is_palette_open());

        composer.handle_key(press(KeyCode::Tab), &mut draft);

        assert_eq!(draft, "/help ");
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn test_palette_closes_for_plain_text() {
        let mut composer = ConversationComposer::new("");
        let mut draft = String::new();
        type_text(&mut composer, &mut draft, "/");
        assert!(composer.is_palette_open());

        composer.handle_key(press(KeyCode::Backspace), &mut draft);
        assert!(!composer.is_palette_open());

        type_text(&mut composer, &mut draft, "a/b");
        assert!(!composer.is_palette_open());
    }
}
