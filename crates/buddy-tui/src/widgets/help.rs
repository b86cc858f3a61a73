//! Key binding overlay

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

const BINDINGS: &[(&str, &str)] = &[
    ("Enter", "Send message"),
    ("?", "Toggle this help (empty prompt)"),
    ("PgUp/PgDn", "Scroll conversation"),
    ("Ctrl+U", "Clear prompt"),
    ("Ctrl+W", "Delete word"),
    ("Esc/Ctrl+C", "Quit"),
];

/// Centered box listing the key bindings
pub struct HelpPanel<'a> {
    theme: &'a Theme,
}

impl<'a> HelpPanel<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from("")];
        for (key, what) in BINDINGS {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", key), self.theme.accent_style()),
                Span::styled(what.to_string(), self.theme.base_style()),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Ask for files, tests, builds or code; Buddy runs the tools.",
            self.theme.dim_style(),
        )));
        lines
    }
}

impl Widget for HelpPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.lines();
        let width = area.width.min(66);
        let height = area.height.min(lines.len() as u16 + 2);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );

        Clear.render(popup, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.accent_style())
            .title(Span::styled(" Help ", self.theme.accent_bold()));
        let inner = block.inner(popup);
        block.render(popup, buf);
        Paragraph::new(lines).render(inner, buf);
    }
}
