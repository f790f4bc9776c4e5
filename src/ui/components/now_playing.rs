use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::player::PlayerState;
use crate::ui::theme::{Theme, PAUSED_ICON, PLAYING_ICON};

/// Status bar showing what the player is doing
pub struct NowPlaying<'a> {
    state: &'a PlayerState,
    /// Display name of the track that was started last
    title: Option<&'a str>,
}

impl<'a> NowPlaying<'a> {
    pub fn new(state: &'a PlayerState, title: Option<&'a str>) -> Self {
        Self { state, title }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(theme.border());

        let line = if self.state.has_content() {
            let (icon, style) = if self.state.playing {
                (PLAYING_ICON, theme.success())
            } else {
                (PAUSED_ICON, theme.warning())
            };
            let title = self
                .title
                .or(self.state.filename.as_deref())
                .unwrap_or_default();

            Line::from(vec![
                Span::styled(format!("{} ", icon), style),
                Span::styled(title.to_string(), theme.normal()),
                Span::styled(
                    format!("  {}", format_elapsed(self.state.elapsed)),
                    theme.muted(),
                ),
            ])
        } else {
            Line::from(Span::styled("Nothing playing", theme.muted()))
        };

        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}

/// `m:ss`, or `h:mm:ss` past the hour
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "0:00");
        assert_eq!(format_elapsed(65.9), "1:05");
        assert_eq!(format_elapsed(3725.0), "1:02:05");
        assert_eq!(format_elapsed(-3.0), "0:00");
    }
}
