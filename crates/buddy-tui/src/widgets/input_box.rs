//! Single-line prompt input

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Editable prompt line with a character cursor
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position in chars
    cursor: usize,
    /// First visible column
    scroll: usize,
    placeholder: String,
    title: String,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Take the current text, leaving the box empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        self.scroll = 0;
        std::mem::take(&mut self.content)
    }

    pub fn clear(&mut self) {
        self.take();
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn remove_chars(&mut self, start: usize, end: usize) {
        let range = self.byte_index(start)..self.byte_index(end);
        self.content.replace_range(range, "");
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn column_of(&self, char_index: usize) -> usize {
        self.content
            .chars()
            .take(char_index)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Apply an editing action. Returns whether it was consumed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let len = self.char_count();
        let handled = match action {
            Action::Char(c) => {
                self.insert(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_chars(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                true
            }
            Action::Delete if self.cursor < len => {
                self.remove_chars(self.cursor, self.cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < len => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = len;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                self.remove_chars(start, self.cursor);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                // Single line: newlines become one space
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert(' ');
                        }
                    } else {
                        self.insert(c);
                    }
                }
                true
            }
            _ => false,
        };

        if handled {
            self.update_scroll(width as usize);
        }
        handled
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders take two columns, keep one for the cursor
        let visible = width.saturating_sub(3).max(1);
        let column = self.column_of(self.cursor);
        if column < self.scroll {
            self.scroll = column;
        } else if column >= self.scroll + visible {
            self.scroll = column + 1 - visible;
        }
    }

    /// Render the box. The cursor cell is highlighted only when `focused`.
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, focused: bool) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(if focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });
        if !self.title.is_empty() {
            block = block.title(Line::from(Span::styled(
                format!(" {} ", self.title),
                theme.dim_style(),
            )));
        }

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let paragraph = if self.content.is_empty() {
            Paragraph::new(self.placeholder.as_str()).style(theme.dim_style())
        } else {
            let mut visible = String::new();
            let mut column = 0;
            for c in self.content.chars() {
                let w = c.width().unwrap_or(0);
                if column >= self.scroll {
                    if column + w > self.scroll + inner.width as usize {
                        break;
                    }
                    visible.push(c);
                }
                column += w;
            }
            Paragraph::new(visible).style(theme.base_style())
        };
        paragraph.render(inner, buf);

        if focused {
            let x = self.column_of(self.cursor).saturating_sub(self.scroll);
            if x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 80);
        }
        input
    }

    #[test]
    fn test_typing_and_take() {
        let mut input = typed("héllo");
        assert_eq!(input.content(), "héllo");
        assert_eq!(input.take(), "héllo");
        assert!(input.is_empty());
        input.handle_action(&Action::Char('x'), 80);
        assert_eq!(input.content(), "x");
    }

    #[test]
    fn test_backspace_and_delete_multibyte() {
        let mut input = typed("aéb");
        input.handle_action(&Action::Left, 80);
        input.handle_action(&Action::Backspace, 80);
        assert_eq!(input.content(), "ab");
        input.handle_action(&Action::Home, 80);
        input.handle_action(&Action::Delete, 80);
        assert_eq!(input.content(), "b");
        assert!(!input.handle_action(&Action::Backspace, 80));
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("run the tests  ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "run the ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "run ");
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut input = InputBox::new();
        input.handle_action(&Action::Paste("one\r\ntwo\nthree".into()), 80);
        assert_eq!(input.content(), "one two three");
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut input = InputBox::new();
        for _ in 0..30 {
            input.handle_action(&Action::Char('x'), 13);
        }
        assert_eq!(input.scroll, 30 + 1 - 10);
        input.handle_action(&Action::Home, 13);
        assert_eq!(input.scroll, 0);
    }

    #[test]
    fn test_render_placeholder() {
        let input = InputBox::new().with_placeholder("Ask me anything");
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        input.render(area, &mut buf, &Theme::dark(), true);
        let row: String = (1..16).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert_eq!(row, "Ask me anything");
    }
}
