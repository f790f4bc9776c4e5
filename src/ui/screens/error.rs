use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::ui::theme::Theme;

/// Shows a failed operation until dismissed
pub struct ErrorScreen {
    pub message: String,
}

impl ErrorScreen {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns true once the user dismisses the error
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')
        )
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(area);

        let error_line = Line::from(vec![
            Span::styled("Error: ", theme.error()),
            Span::styled(&self.message, theme.normal()),
        ]);
        frame.render_widget(
            Paragraph::new(error_line)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[1],
        );

        let help = Line::from(vec![
            Span::styled("Enter/Esc", theme.highlight()),
            Span::styled(" back to menu", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(help).alignment(Alignment::Center), chunks[2]);
    }
}
