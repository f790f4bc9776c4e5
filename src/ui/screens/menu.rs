use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::ui::components::SelectableList;
use crate::ui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    PlayPause,
    Search,
    Exit,
    Logout,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::PlayPause => "Play/Pause",
            MenuItem::Search => "Search",
            MenuItem::Exit => "Exit",
            MenuItem::Logout => "Log out",
        }
    }

    /// Entries offered, depending on whether a track is loaded
    pub fn available(has_content: bool) -> Vec<MenuItem> {
        let mut items = Vec::with_capacity(4);
        if has_content {
            items.push(MenuItem::PlayPause);
        }
        items.extend([MenuItem::Search, MenuItem::Exit, MenuItem::Logout]);
        items
    }
}

pub enum MenuAction {
    Select(MenuItem),
}

/// Main menu
pub struct MenuScreen {
    list: SelectableList<MenuItem>,
    has_content: bool,
    message: Option<String>,
}

impl MenuScreen {
    pub fn new(has_content: bool, message: Option<String>) -> Self {
        Self {
            list: SelectableList::new(MenuItem::available(has_content)),
            has_content,
            message,
        }
    }

    /// Add or drop the Play/Pause entry when the player state changes
    pub fn set_has_content(&mut self, has_content: bool) {
        if self.has_content != has_content {
            let message = self.message.take();
            *self = Self::new(has_content, message);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<MenuAction> {
        match key.code {
            KeyCode::Enter => {
                if let Some(item) = self.list.get_selected() {
                    return Some(MenuAction::Select(*item));
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.list.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.list.next(),
            KeyCode::Esc | KeyCode::Char('q') => return Some(MenuAction::Select(MenuItem::Exit)),
            _ => {}
        }
        None
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(2), // Message
                Constraint::Length(6), // Menu
                Constraint::Length(2), // Help
                Constraint::Min(0),
            ])
            .margin(2)
            .split(area);

        frame.render_widget(
            Paragraph::new(Span::styled("bohemian", theme.title())),
            chunks[0],
        );

        if let Some(message) = &self.message {
            frame.render_widget(
                Paragraph::new(Span::styled(message.as_str(), theme.warning())),
                chunks[1],
            );
        }

        self.list.render(
            frame,
            chunks[2],
            " What would you like to do? ",
            theme,
            |item, selected| {
                let style = if selected {
                    theme.selected()
                } else {
                    theme.normal()
                };
                vec![Span::styled(item.label(), style)]
            },
        );

        let help = Line::from(vec![
            Span::styled("Enter", theme.highlight()),
            Span::styled(" select  ", theme.muted()),
            Span::styled("Space", theme.highlight()),
            Span::styled(" play/pause  ", theme.muted()),
            Span::styled("←/→", theme.highlight()),
            Span::styled(" seek  ", theme.muted()),
            Span::styled("q", theme.highlight()),
            Span::styled(" quit", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[3]);
    }
}
