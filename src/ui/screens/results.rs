use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::api::SearchResult;
use crate::ui::components::SelectableList;
use crate::ui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsKind {
    Tracks,
    Artists,
}

pub enum ResultsAction {
    Select(SearchResult),
    Back,
}

/// Pick a track or an artist from catalog results
pub struct ResultsScreen {
    pub kind: ResultsKind,
    list: SelectableList<SearchResult>,
}

impl ResultsScreen {
    pub fn tracks(results: Vec<SearchResult>) -> Self {
        Self {
            kind: ResultsKind::Tracks,
            list: SelectableList::new(results),
        }
    }

    pub fn artists(results: Vec<SearchResult>) -> Self {
        Self {
            kind: ResultsKind::Artists,
            list: SelectableList::new(results),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ResultsAction> {
        match key.code {
            KeyCode::Enter => {
                if let Some(result) = self.list.get_selected() {
                    return Some(ResultsAction::Select(result.clone()));
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.list.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.list.next(),
            KeyCode::Esc => return Some(ResultsAction::Back),
            _ => {}
        }
        None
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Min(5),    // Results
                Constraint::Length(2), // Help
            ])
            .margin(1)
            .split(area);

        let question = match self.kind {
            ResultsKind::Tracks => "Which track?",
            ResultsKind::Artists => "Which artist?",
        };
        let title = Line::from(vec![
            Span::styled(question, theme.title()),
            Span::styled(format!(" ({} found)", self.list.len()), theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(title), chunks[0]);

        let kind = self.kind;
        self.list
            .render(frame, chunks[1], "", theme, |result, selected| {
                let name_style = if selected {
                    theme.selected()
                } else {
                    theme.normal()
                };
                let detail = match kind {
                    ResultsKind::Tracks => result.artist_name(),
                    ResultsKind::Artists => result.genre_name(),
                };

                let mut spans = vec![Span::styled(result.name.clone(), name_style)];
                if let Some(detail) = detail {
                    spans.push(Span::styled(format!(" ({})", detail), theme.accent()));
                }
                spans
            });

        let help = Line::from(vec![
            Span::styled("Enter", theme.highlight()),
            Span::styled(" select  ", theme.muted()),
            Span::styled("Space", theme.highlight()),
            Span::styled(" play/pause  ", theme.muted()),
            Span::styled("←/→", theme.highlight()),
            Span::styled(" seek  ", theme.muted()),
            Span::styled("Esc", theme.highlight()),
            Span::styled(" menu", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[2]);
    }
}
