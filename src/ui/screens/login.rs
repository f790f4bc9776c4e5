use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::config::Credentials;
use crate::ui::components::Input;
use crate::ui::theme::Theme;

pub enum LoginAction {
    Submit(Credentials),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

/// Username and password prompt
pub struct LoginScreen {
    username: Input,
    password: Input,
    field: Field,
    /// Shown above the form, e.g. the reason the last attempt failed
    message: Option<String>,
}

impl LoginScreen {
    pub fn new() -> Self {
        Self {
            username: Input::new().focus(),
            password: Input::password(),
            field: Field::Username,
            message: None,
        }
    }

    /// Prompt again after a failed attempt, keeping the username
    pub fn retry(username: &str, message: impl Into<String>) -> Self {
        let mut screen = Self {
            username: Input::with_value(username),
            message: Some(message.into()),
            ..Self::new()
        };
        screen.set_field(if username.is_empty() {
            Field::Username
        } else {
            Field::Password
        });
        screen
    }

    fn set_field(&mut self, field: Field) {
        self.field = field;
        self.username.focused = field == Field::Username;
        self.password.focused = field == Field::Password;
    }

    fn toggle_field(&mut self) {
        self.set_field(match self.field {
            Field::Username => Field::Password,
            Field::Password => Field::Username,
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<LoginAction> {
        match key.code {
            KeyCode::Esc => return Some(LoginAction::Quit),
            KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => self.toggle_field(),
            KeyCode::Enter => match self.field {
                Field::Username => self.set_field(Field::Password),
                Field::Password => {
                    let credentials = Credentials::new(
                        self.username.get_value().trim(),
                        self.password.get_value(),
                    );
                    if credentials.username.is_empty() || credentials.password.is_empty() {
                        self.message =
                            Some("You must supply a username and password.".to_string());
                    } else {
                        return Some(LoginAction::Submit(credentials));
                    }
                }
            },
            _ => {
                match self.field {
                    Field::Username => self.username.handle_key(key),
                    Field::Password => self.password.handle_key(key),
                };
            }
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Title
                Constraint::Length(2), // Message
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(2), // Help
                Constraint::Min(0),
            ])
            .margin(2)
            .split(area);

        let title = Line::from(vec![
            Span::styled("bohemian", theme.title()),
            Span::styled("  log in to Rhapsody", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(title), chunks[0]);

        if let Some(message) = &self.message {
            frame.render_widget(
                Paragraph::new(Span::styled(message.as_str(), theme.error())),
                chunks[1],
            );
        }

        self.username
            .render(frame, chunks[2], " Rhapsody username ", theme);
        self.password
            .render(frame, chunks[3], " Rhapsody password ", theme);

        let help = Line::from(vec![
            Span::styled("Enter", theme.highlight()),
            Span::styled(" next/log in  ", theme.muted()),
            Span::styled("Tab", theme.highlight()),
            Span::styled(" switch field  ", theme.muted()),
            Span::styled("Esc", theme.highlight()),
            Span::styled(" quit", theme.muted()),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[4]);
    }
}

impl Default for LoginScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(screen: &mut LoginScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_submit_credentials() {
        let mut screen = LoginScreen::new();
        type_text(&mut screen, "freddie");
        assert!(screen.handle_key(KeyEvent::from(KeyCode::Enter)).is_none());
        type_text(&mut screen, "mercury");

        match screen.handle_key(KeyEvent::from(KeyCode::Enter)) {
            Some(LoginAction::Submit(credentials)) => {
                assert_eq!(credentials, Credentials::new("freddie", "mercury"));
            }
            _ => panic!("expected credentials"),
        }
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let mut screen = LoginScreen::retry("freddie", "Login failed: bad password");
        assert!(screen.handle_key(KeyEvent::from(KeyCode::Enter)).is_none());
        assert_eq!(
            screen.message.as_deref(),
            Some("You must supply a username and password.")
        );
    }

    #[test]
    fn test_escape_quits() {
        let mut screen = LoginScreen::new();
        assert!(matches!(
            screen.handle_key(KeyEvent::from(KeyCode::Esc)),
            Some(LoginAction::Quit)
        ));
    }
}
