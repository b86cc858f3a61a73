//! Animated busy indicator

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Frame to show after `elapsed` of animation
pub fn frame_at(elapsed: Duration) -> &'static str {
    let index = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
    FRAMES[index % FRAMES.len()]
}

/// One-line spinner followed by a label
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    started: Instant,
}

impl<'a> Spinner<'a> {
    /// `started` anchors the animation so redraws do not restart it
    pub fn new(label: &'a str, theme: &'a Theme, started: Instant) -> Self {
        Self {
            label,
            theme,
            started,
        }
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        let text = format!("{} {}", frame_at(self.started.elapsed()), self.label);
        buf.set_span(
            area.x,
            area.y,
            &Span::styled(text, self.theme.accent_style()),
            area.width,
        );
    }
}
