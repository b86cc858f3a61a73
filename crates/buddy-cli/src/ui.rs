//! TUI implementation for console-buddy

use crate::utils::preview;
use buddy_agent::{ConversationEngine, ConversationTurn, StreamEvent, TurnReceiver, spawn_turn};
use buddy_tui::{
    Action, Theme,
    widgets::{ChatMessage, HelpPanel, InputBox, MessageList, Spinner, message_list},
};
use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::{Stream, StreamExt};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const IDLE_STATUS: &str = "Ready. (? for help)";
const BUSY_STATUS: &str = "AI is working...";
const PAGE: usize = 10;

/// What a stream event did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn is still running
    Pending,
    /// History gained the finished exchange and should be persisted
    Committed,
    /// The turn failed; history is unchanged
    Failed(String),
}

/// Input and history snapshot for a new turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub history: Vec<ConversationTurn>,
    pub input: String,
}

/// Conversation state machine behind the chat screen.
///
/// Idle until `submit` starts a turn; Awaiting until a terminal event arrives.
/// History only changes when a turn completes.
#[derive(Debug, Default)]
pub struct Session {
    history: Vec<ConversationTurn>,
    loading: bool,
    input: String,
    accumulated: String,
    tool_status: Option<String>,
}

impl Session {
    pub fn new(history: Vec<ConversationTurn>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Text streamed so far in the current turn
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated
    }

    /// Transient tool activity line
    pub fn tool_status(&self) -> Option<&str> {
        self.tool_status.as_deref()
    }

    /// Start a turn. Returns `None` while another turn is in flight.
    pub fn submit(&mut self, input: impl Into<String>) -> Option<TurnRequest> {
        if self.loading {
            return None;
        }
        let input = input.into();
        self.loading = true;
        self.input = input.clone();
        self.accumulated.clear();
        self.tool_status = None;
        Some(TurnRequest {
            history: self.history.clone(),
            input,
        })
    }

    pub fn apply_event(&mut self, event: &StreamEvent) -> TurnOutcome {
        if !self.loading {
            debug!(?event, "stream event outside a turn, ignored");
            return TurnOutcome::Pending;
        }

        match event {
            StreamEvent::TextChunk { text } => {
                self.accumulated.push_str(text);
                TurnOutcome::Pending
            }
            StreamEvent::ToolCallStarted { name, .. } => {
                self.tool_status = Some(format!("Running {}...", name));
                TurnOutcome::Pending
            }
            StreamEvent::ToolCallFinished { name, error, .. } => {
                self.tool_status = Some(match error {
                    Some(_) => format!("{} failed", name),
                    None => format!("{} finished", name),
                });
                TurnOutcome::Pending
            }
            StreamEvent::TurnError { error } => {
                self.finish();
                TurnOutcome::Failed(error.clone())
            }
            StreamEvent::TurnComplete { final_text } => {
                let input = std::mem::take(&mut self.input);
                buddy_agent::conversation::commit_turn(&mut self.history, &input, final_text);
                self.finish();
                TurnOutcome::Committed
            }
        }
    }

    fn finish(&mut self) {
        self.loading = false;
        self.input.clear();
        self.tool_status = None;
    }
}

/// What the event loop should do after a key
#[derive(Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Submit(TurnRequest),
    Quit,
}

/// TUI application state
pub struct TuiState {
    session: Session,
    messages: Vec<ChatMessage>,
    input: InputBox,
    /// Lines skipped from the top; `usize::MAX` follows the bottom
    scroll: usize,
    theme: Theme,
    model_name: String,
    project_label: Option<String>,
    show_help: bool,
    spinner_start: Instant,
}

impl TuiState {
    /// Restored history is shown as the opening transcript
    pub fn new(
        model_name: impl Into<String>,
        history: Vec<ConversationTurn>,
        project_label: Option<String>,
    ) -> Self {
        let mut messages: Vec<ChatMessage> = history
            .iter()
            .map(|turn| match turn.role {
                buddy_ai::Role::User => ChatMessage::user(turn.text.clone()),
                buddy_ai::Role::Model => ChatMessage::buddy(turn.text.clone()),
            })
            .collect();
        if !history.is_empty() {
            messages.push(ChatMessage::notice(format!(
                "Restored {} messages from the previous session.",
                history.len()
            )));
        }

        Self {
            session: Session::new(history),
            messages,
            input: InputBox::new()
                .with_placeholder("Ask Buddy anything...")
                .with_title("prompt"),
            scroll: usize::MAX,
            theme: Theme::dark(),
            model_name: model_name.into(),
            project_label,
            show_help: false,
            spinner_start: Instant::now(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll = usize::MAX;
    }

    /// Submit the prompt. Ignored while a turn is running.
    fn submit(&mut self) -> Control {
        if self.session.is_loading() {
            return Control::Continue;
        }
        let input = self.input.take();
        let Some(request) = self.session.submit(input.clone()) else {
            return Control::Continue;
        };

        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::buddy_streaming());
        self.spinner_start = Instant::now();
        self.scroll_to_bottom();
        Control::Submit(request)
    }

    /// Handle keyboard action
    pub fn handle_action(&mut self, action: Action, width: u16) -> Control {
        if self.show_help {
            self.show_help = false;
            return Control::Continue;
        }

        match action {
            Action::Quit => Control::Quit,
            Action::Submit => self.submit(),
            Action::Char('?') if self.input.is_empty() => {
                self.show_help = true;
                Control::Continue
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                Control::Continue
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE);
                Control::Continue
            }
            other => {
                self.input.handle_action(&other, width);
                Control::Continue
            }
        }
    }

    /// The reply being streamed, if the last entry is one
    fn streaming_reply(&mut self) -> Option<&mut ChatMessage> {
        self.messages.last_mut().filter(|m| m.streaming)
    }

    /// Apply a bridge event to the session and the transcript
    pub fn handle_stream_event(&mut self, event: StreamEvent) -> TurnOutcome {
        let outcome = self.session.apply_event(&event);

        match event {
            StreamEvent::TextChunk { .. } => {
                let text = self.session.accumulated_text().to_string();
                if let Some(reply) = self.streaming_reply() {
                    reply.content = text;
                }
            }
            StreamEvent::ToolCallStarted { .. } => {}
            StreamEvent::ToolCallFinished {
                name,
                output,
                error,
            } => {
                let body = match error {
                    Some(e) => format!("error: {}", e),
                    None => preview(&output, 4, 120),
                };
                let entry = ChatMessage::tool(name, body);
                let at = match self.messages.last() {
                    Some(last) if last.streaming => self.messages.len() - 1,
                    _ => self.messages.len(),
                };
                self.messages.insert(at, entry);
            }
            StreamEvent::TurnComplete { final_text } => {
                if let Some(reply) = self.streaming_reply() {
                    reply.content = final_text;
                    reply.streaming = false;
                }
            }
            StreamEvent::TurnError { error } => {
                let partial = self.streaming_reply().map(|r| r.content.is_empty());
                match partial {
                    Some(true) => {
                        self.messages.pop();
                    }
                    Some(false) => {
                        if let Some(reply) = self.streaming_reply() {
                            reply.streaming = false;
                        }
                    }
                    None => {}
                }
                self.messages.push(ChatMessage::error(error));
            }
        }

        self.scroll_to_bottom();
        outcome
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_messages(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input.render(
            chunks[2],
            frame.buffer_mut(),
            &self.theme,
            !self.session.is_loading(),
        );

        if self.show_help {
            frame.render_widget(HelpPanel::new(&self.theme), size);
        }
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" buddy │ {} ", self.model_name));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }

        if self.messages.is_empty() {
            let welcome = Paragraph::new(vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Console Buddy", self.theme.accent_bold()),
                    Span::styled(" - your terminal coding assistant", self.theme.dim_style()),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  Ask me to read, write or run things in this project.",
                    self.theme.dim_style(),
                )),
                Line::from(Span::styled(
                    "  Press ? for key bindings.",
                    self.theme.dim_style(),
                )),
            ]);
            frame.render_widget(welcome, inner);
            return;
        }

        // Leave a column for the scrollbar
        let text_width = inner.width.saturating_sub(1).max(1) as usize;
        let content_height =
            message_list::transcript_height(&self.messages, &self.theme, text_width);
        let max_scroll = content_height.saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        let text_area = Rect {
            width: text_width as u16,
            ..inner
        };
        frame.render_widget(
            MessageList::new(&self.messages, &self.theme).scroll(self.scroll),
            text_area,
        );

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(self.scroll);
            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn context_label(&self) -> String {
        let mut label = format!("Model: {}", self.model_name);
        if let Some(project) = &self.project_label {
            label.push_str(&format!(" | {}", project));
        }
        label
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.session.is_loading() {
            let context = format!(" | {}", self.context_label());
            let context_width = (context.chars().count() as u16).min(area.width / 2);
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(1), Constraint::Length(context_width)])
                .split(area);

            let label = self.session.tool_status().unwrap_or(BUSY_STATUS);
            frame.render_widget(
                Spinner::new(label, &self.theme, self.spinner_start),
                chunks[0],
            );
            frame.render_widget(
                Paragraph::new(Span::styled(context, self.theme.dim_style())),
                chunks[1],
            );
        } else {
            let line = format!("{} | {}", IDLE_STATUS, self.context_label());
            frame.render_widget(
                Paragraph::new(Span::styled(line, self.theme.dim_style())),
                area,
            );
        }
    }
}

/// Next event of the running turn; never resolves when idle
async fn next_turn_event(turn: &mut Option<TurnReceiver>) -> Option<StreamEvent> {
    match turn {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Run the TUI application.
///
/// `on_commit` is called with the full history after every completed turn.
/// The terminal is restored on every exit path, errors included.
pub async fn run_tui<F>(
    engine: Arc<ConversationEngine>,
    mut state: TuiState,
    mut on_commit: F,
) -> anyhow::Result<()>
where
    F: FnMut(&[ConversationTurn]),
{
    use crossterm::{
        event::EnableBracketedPaste,
        execute,
        terminal::{EnterAlternateScreen, enable_raw_mode},
    };
    use ratatui::backend::CrosstermBackend;

    enable_raw_mode()?;
    let result = match execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)
        .and_then(|_| Terminal::new(CrosstermBackend::new(io::stdout())))
    {
        Ok(mut terminal) => {
            let result = event_loop(
                &mut terminal,
                EventStream::new(),
                &engine,
                &mut state,
                &mut on_commit,
            )
            .await;
            if let Err(e) = terminal.show_cursor() {
                debug!("Failed to show cursor: {}", e);
            }
            result
        }
        Err(e) => Err(e.into()),
    };

    let restored = restore_terminal();
    result?;
    restored?;
    Ok(())
}

fn restore_terminal() -> io::Result<()> {
    use crossterm::{
        event::DisableBracketedPaste,
        execute,
        terminal::{LeaveAlternateScreen, disable_raw_mode},
    };

    disable_raw_mode()?;
    execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen)
}

/// Draw and dispatch until the user quits or an event source fails
async fn event_loop<B, S, F>(
    terminal: &mut Terminal<B>,
    mut events: S,
    engine: &Arc<ConversationEngine>,
    state: &mut TuiState,
    on_commit: &mut F,
) -> anyhow::Result<()>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
    S: Stream<Item = io::Result<Event>> + Unpin,
    F: FnMut(&[ConversationTurn]),
{
    let mut tick_interval = tokio::time::interval(Duration::from_millis(80));
    let mut turn: Option<TurnReceiver> = None;

    loop {
        terminal.draw(|frame| state.render(frame))?;
        let area_width = terminal.size()?.width;

        tokio::select! {
            event = next_turn_event(&mut turn) => {
                match event {
                    Some(event) => {
                        if state.handle_stream_event(event) == TurnOutcome::Committed {
                            on_commit(state.session().history());
                        }
                    }
                    None => turn = None,
                }
            }

            event = events.next() => {
                match event {
                    Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                        MouseEventKind::ScrollUp => state.scroll = state.scroll.saturating_sub(3),
                        MouseEventKind::ScrollDown => state.scroll = state.scroll.saturating_add(3),
                        _ => {}
                    },
                    Some(Ok(event)) => {
                        let Some(action) = buddy_tui::event_to_action(event) else {
                            continue;
                        };
                        match state.handle_action(action, area_width) {
                            Control::Continue => {}
                            Control::Quit => return Ok(()),
                            Control::Submit(request) => {
                                info!(input_len = request.input.len(), "starting turn");
                                turn = Some(spawn_turn(engine.clone(), request.history, request.input));
                            }
                        }
                    }
                    Some(Err(e)) => return Err(anyhow::anyhow!("Event error: {}", e)),
                    None => return Ok(()),
                }
            }

            // Spinner animation
            _ = tick_interval.tick() => {}
        }
    }
}
