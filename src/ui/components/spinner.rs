use std::time::{Duration, Instant};

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::ui::theme::{Theme, SPINNER_FRAMES};

const FRAME_MILLIS: u128 = 80;

/// Animated loading indicator with an optional warning line underneath
pub struct Spinner {
    start_time: Instant,
    message: String,
    notice: Option<String>,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            message: message.into(),
            notice: None,
        }
    }

    fn current_frame(&self) -> &'static str {
        let elapsed = self.start_time.elapsed().as_millis();
        let frame_index = (elapsed / FRAME_MILLIS) as usize % SPINNER_FRAMES.len();
        SPINNER_FRAMES[frame_index]
    }

    /// Seconds spent so far, once it gets noticeable
    fn elapsed_string(&self) -> Option<String> {
        let elapsed = self.start_time.elapsed();
        (elapsed >= Duration::from_secs(2)).then(|| format!("{}s", elapsed.as_secs()))
    }

    /// Show a warning under the spinner, e.g. a retry in progress
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let mut spans = vec![
            Span::styled(format!("{} ", self.current_frame()), theme.highlight()),
            Span::styled(&self.message, theme.normal()),
        ];
        if let Some(elapsed) = self.elapsed_string() {
            spans.push(Span::styled(format!(" ({})", elapsed), theme.muted()));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            chunks[0],
        );

        if let Some(notice) = &self.notice {
            frame.render_widget(
                Paragraph::new(Span::styled(notice.as_str(), theme.warning()))
                    .alignment(Alignment::Center),
                chunks[1],
            );
        }
    }
}
