use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::ui::components::Input;
use crate::ui::theme::Theme;

pub enum SearchAction {
    /// Raw artist and track inputs, either may be blank
    Submit { artist: String, track: String },
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Artist,
    Track,
}

/// Artist and track search form
pub struct SearchScreen {
    artist: Input,
    track: Input,
    field: Field,
}

impl SearchScreen {
    pub fn new() -> Self {
        Self {
            artist: Input::new().focus(),
            track: Input::new(),
            field: Field::Artist,
        }
    }

    fn set_field(&mut self, field: Field) {
        self.field = field;
        self.artist.focused = field == Field::Artist;
        self.track.focused = field == Field::Track;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<SearchAction> {
        match (key.code, self.field) {
            (KeyCode::Esc, _) => return Some(SearchAction::Back),
            (KeyCode::Enter | KeyCode::Tab | KeyCode::Down, Field::Artist) => {
                self.set_field(Field::Track)
            }
            (KeyCode::Tab | KeyCode::Up | KeyCode::BackTab, Field::Track) => {
                self.set_field(Field::Artist)
            }
            (KeyCode::Enter, Field::Track) => {
                return Some(SearchAction::Submit {
                    artist: self.artist.get_value().to_string(),
                    track: self.track.get_value().to_string(),
                });
            }
            (_, Field::Artist) => {
                self.artist.handle_key(key);
            }
            (_, Field::Track) => {
                self.track.handle_key(key);
            }
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(3), // Artist
                Constraint::Length(3), // Track
                Constraint::Length(2), // Help
                Constraint::Min(0),
            ])
            .margin(2)
            .split(area);

        frame.render_widget(
            Paragraph::new(Span::styled("Search", theme.title())),
            chunks[0],
        );

        self.artist.render(frame, chunks[1], " Artist ", theme);
        self.track.render(frame, chunks[2], " Track ", theme);

        let help = Line::from(vec![
            Span::styled("Enter", theme.highlight()),
            Span::styled(" next/search  ", theme.muted()),
            Span::styled("Tab", theme.highlight()),
            Span::styled(" switch field  ", theme.muted()),
            Span::styled("Esc", theme.highlight()),
            Span::styled(" back", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[3]);
    }
}

impl Default for SearchScreen {
    fn default() -> Self {
        Self::new()
    }
}
