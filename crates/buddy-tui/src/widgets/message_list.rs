//! Conversation transcript

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Who a transcript entry belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    User,
    Buddy,
    /// Tool activity, by tool name
    Tool(String),
    /// A failed turn or other problem
    Error,
    /// Informational line from the app itself
    Notice,
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
    /// The reply is still arriving
    pub streaming: bool,
}

impl ChatMessage {
    fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
            streaming: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Speaker::User, content)
    }

    pub fn buddy(content: impl Into<String>) -> Self {
        Self::new(Speaker::Buddy, content)
    }

    pub fn buddy_streaming() -> Self {
        Self {
            streaming: true,
            ..Self::new(Speaker::Buddy, "")
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Speaker::Tool(name.into()), content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Speaker::Error, content)
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(Speaker::Notice, content)
    }
}

/// Lay out one message as styled lines, wrapped to `width`
pub fn message_lines(msg: &ChatMessage, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let (label, header_style, body_style) = match &msg.speaker {
        Speaker::User => ("You".to_string(), theme.accent_bold(), theme.base_style()),
        Speaker::Buddy => ("Buddy".to_string(), theme.reply_bold(), theme.base_style()),
        Speaker::Tool(name) => (format!("⚙ {}", name), theme.tool_style(), theme.dim_style()),
        Speaker::Error => ("Error".to_string(), theme.error_style(), theme.error_style()),
        Speaker::Notice => ("●".to_string(), theme.dim_style(), theme.dim_style()),
    };

    let header = if msg.streaming {
        format!("{} ▌", label)
    } else {
        label
    };
    let mut lines = vec![Line::from(Span::styled(header, header_style))];

    let body_width = width.saturating_sub(2).max(1);
    if msg.streaming && msg.content.is_empty() {
        lines.push(Line::from(Span::styled(
            "  thinking...",
            theme.dim_style(),
        )));
    } else {
        let mut in_code = false;
        for raw in msg.content.lines() {
            if msg.speaker == Speaker::Buddy && raw.trim_start().starts_with("```") {
                in_code = !in_code;
                lines.push(Line::from(Span::styled(
                    format!("  {}", raw),
                    theme.dim_style(),
                )));
                continue;
            }

            if in_code {
                // Code keeps its layout; the paragraph clips long lines
                lines.push(Line::from(Span::styled(
                    format!("  {}", raw),
                    theme.code_style(),
                )));
                continue;
            }
            if raw.is_empty() {
                lines.push(Line::from(""));
                continue;
            }
            for piece in textwrap::wrap(raw, body_width) {
                lines.push(Line::from(Span::styled(format!("  {}", piece), body_style)));
            }
        }
    }

    lines.push(Line::from(""));
    lines
}

/// Total rendered height of `messages` at `width`
pub fn transcript_height(messages: &[ChatMessage], theme: &Theme, width: usize) -> usize {
    messages
        .iter()
        .map(|m| message_lines(m, theme, width).len())
        .sum()
}

/// Scrollable view over the transcript
pub struct MessageList<'a> {
    messages: &'a [ChatMessage],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
        }
    }

    /// Skip this many lines from the top
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = area.width as usize;
        let visible: Vec<Line> = self
            .messages
            .iter()
            .flat_map(|m| message_lines(m, self.theme, width))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();
        Paragraph::new(visible).render(area, buf);
    }
}
