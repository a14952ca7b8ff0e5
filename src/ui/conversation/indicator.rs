use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// One-line status row: the thinking animation while a request is in flight,
/// otherwise the latest notice (help text, dropped submissions).
pub struct StatusLine<'a> {
    pending: bool,
    assistant_name: &'a str,
    notice: Option<&'a str>,
}

impl<'a> StatusLine<'a> {
    pub fn new(pending: bool, assistant_name: &'a str, notice: Option<&'a str>) -> Self {
        Self {
            pending,
            assistant_name,
            notice,
        }
    }
}

/// Cycles through ".", "..", "...", "   " every 300ms
fn thinking_dots(millis: u128) -> &'static str {
    match (millis / 300) % 4 {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = if self.pending {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();

            Line::from(vec![
                Span::styled("🤖 ", Style::default().fg(Color::Green)),
                Span::styled(
                    format!("{} is thinking", self.assistant_name),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(thinking_dots(millis), Style::default().fg(Color::Yellow)),
            ])
        } else if let Some(notice) = self.notice {
            Line::from(vec![Span::styled(notice, Style::default().fg(Color::Yellow))])
        } else {
            return;
        };

        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, area: Rect) -> String {
        (0..area.width)
            .map(|x| buf.get(x, 0).symbol().to_string())
            .collect()
    }

    #[test]
    fn test_thinking_dots_cycle() {
        assert_eq!(thinking_dots(0), ".");
        assert_eq!(thinking_dots(300), "..");
        assert_eq!(thinking_dots(600), "...");
        assert_eq!(thinking_dots(900), "   ");
        assert_eq!(thinking_dots(1200), ".");
    }

    #[test]
    fn test_pending_wins_over_notice() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);

        StatusLine::new(true, "GarAI", Some("ignored")).render(area, &mut buf);

        let text = row(&buf, area);
        assert!(text.contains("GarAI is thinking"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn test_idle_shows_notice() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);

        StatusLine::new(false, "GarAI", Some("Still waiting")).render(area, &mut buf);

        assert!(row(&buf, area).starts_with("Still waiting"));
    }
}
