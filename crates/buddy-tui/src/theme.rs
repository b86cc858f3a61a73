//! Colors

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the chat screen
#[derive(Debug, Clone)]
pub struct Theme {
    pub fg: Color,
    /// Secondary text, status line
    pub dim: Color,
    /// Prompts, user messages, focus
    pub accent: Color,
    /// Buddy's replies
    pub reply: Color,
    pub error: Color,
    /// Tool activity
    pub tool: Color,
    pub border: Color,
    /// Fenced code in replies
    pub code: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            reply: Color::Green,
            error: Color::Red,
            tool: Color::Magenta,
            border: Color::DarkGray,
            code: Color::Yellow,
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent_style().add_modifier(Modifier::BOLD)
    }

    pub fn reply_bold(&self) -> Style {
        Style::default().fg(self.reply).add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn tool_style(&self) -> Style {
        Style::default().fg(self.tool)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}
