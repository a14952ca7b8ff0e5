//! Transcript display component

use crate::events::{Message, Sender};
use crate::store::Transcript;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the transcript, pinned to the most recent messages
pub struct HistoryView<'a> {
    transcript: &'a Transcript,
    assistant_name: &'a str,
}

impl<'a> HistoryView<'a> {
    pub fn new(transcript: &'a Transcript, assistant_name: &'a str) -> Self {
        Self {
            transcript,
            assistant_name,
        }
    }

    /// All lines for the transcript at `width`, oldest first
    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in self.transcript.messages() {
            all_lines.extend(render_message(message, self.assistant_name, width));
            all_lines.push(Line::default());
        }
        all_lines
    }
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ★ ", self.assistant_name));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);

        // Show the tail that fits
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);

        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Render a single message into lines
fn render_message(message: &Message, assistant_name: &str, width: u16) -> Vec<Line<'static>> {
    let (icon, style) = match message.sender {
        Sender::User => ("👤", Style::default().fg(Color::Blue)),
        Sender::Assistant => ("🤖", Style::default().fg(Color::Green)),
    };

    let mut lines = vec![Line::from(vec![Span::styled(
        format!("{} {}", icon, message.sender.display_name(assistant_name)),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    )])];

    for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

/// Wrap text to fit within the given width, keeping explicit line breaks
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(word);
            current_len += word_len;
        }

        lines.push(current_line);
    }

    lines
}
