use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::theme::Theme;

const MASK_CHAR: char = '*';

/// Single-line text input
pub struct Input {
    pub value: String,
    /// Byte offset of the cursor, always on a char boundary
    pub cursor: usize,
    pub focused: bool,
    /// Render every character as `*`
    pub masked: bool,
}

impl Input {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            focused: false,
            masked: false,
        }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            cursor: value.len(),
            value,
            ..Self::new()
        }
    }

    /// Input for secrets
    pub fn password() -> Self {
        Self {
            masked: true,
            ..Self::new()
        }
    }

    pub fn focus(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn insert(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(c) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }

    /// Apply a text editing key, returning whether it was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.insert(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_start(),
            KeyCode::End => self.move_end(),
            _ => return false,
        }
        true
    }

    pub fn get_value(&self) -> &str {
        &self.value
    }

    /// Text as it appears on screen
    fn display(&self, text: &str) -> String {
        if self.masked {
            text.chars().map(|_| MASK_CHAR).collect()
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.focused {
                theme.highlight()
            } else {
                theme.border()
            })
            .title(title.to_string());

        let (before, after) = self.value.split_at(self.cursor);
        let mut rest = after.chars();
        let cursor_char = rest.next().map(|c| self.display(&c.to_string()));

        let line = if self.focused {
            Line::from(vec![
                Span::styled(self.display(before), theme.normal()),
                Span::styled(
                    cursor_char.unwrap_or_else(|| " ".to_string()),
                    Style::default().add_modifier(Modifier::REVERSED),
                ),
                Span::styled(self.display(rest.as_str()), theme.normal()),
            ])
        } else {
            Line::from(Span::styled(self.display(&self.value), theme.normal()))
        };

        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
