use ratatui::style::{Color, Modifier, Style};

/// Terminal color theme
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
    pub text: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::mocha()
    }
}

impl Theme {
    /// Dark palette with pastel accents
    pub fn mocha() -> Self {
        Self {
            primary: Color::Rgb(203, 166, 247),   // mauve #cba6f7
            secondary: Color::Rgb(250, 179, 135), // peach #fab387
            success: Color::Rgb(166, 227, 161),   // green #a6e3a1
            warning: Color::Rgb(249, 226, 175),   // yellow #f9e2af
            error: Color::Rgb(243, 139, 168),     // red #f38ba8
            muted: Color::Rgb(108, 112, 134),     // overlay #6c7086
            text: Color::Rgb(205, 214, 244),      // text #cdd6f4
        }
    }

    pub fn normal(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Focused inputs and key hints
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Now-playing indicator while audio is running
    pub fn success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Artist names next to track titles
    pub fn accent(&self) -> Style {
        Style::default().fg(self.secondary)
    }
}

/// Selection arrow character
pub const ARROW: &str = "❯";

/// Spinner frames for loading animation
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub const PLAYING_ICON: &str = "▶";
pub const PAUSED_ICON: &str = "⏸";
