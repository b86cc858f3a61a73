//! Key handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press means to the chat screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Printable character
    Char(char),
    /// Enter
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    /// Scroll the conversation up a page
    PageUp,
    /// Scroll the conversation down a page
    PageDown,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    /// Bracketed paste
    Paste(String),
    /// Ctrl+C, Ctrl+Q or Esc
    Quit,
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') | KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('a') => Action::Home,
            KeyCode::Char('e') => Action::End,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Quit,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action.
///
/// Key releases are ignored so terminals that report them do not double
/// every keystroke.
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(key_to_action(key)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_keys() {
        for event in [
            key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            key(KeyCode::Char('q'), KeyModifiers::CONTROL),
            key(KeyCode::Esc, KeyModifiers::NONE),
        ] {
            assert_eq!(key_to_action(event), Action::Quit);
        }
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('?'), KeyModifiers::SHIFT)),
            Action::Char('?')
        );
        assert_eq!(
            key_to_action(key(KeyCode::Enter, KeyModifiers::NONE)),
            Action::Submit
        );
        assert_eq!(
            key_to_action(key(KeyCode::PageUp, KeyModifiers::NONE)),
            Action::PageUp
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('x'), KeyModifiers::ALT)),
            Action::Unknown
        );
    }

    #[test]
    fn test_release_is_ignored() {
        let mut release = key(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(event_to_action(Event::Key(release)), None);
        assert_eq!(
            event_to_action(Event::Paste("hi".into())),
            Some(Action::Paste("hi".into()))
        );
        assert_eq!(event_to_action(Event::FocusGained), None);
    }
}
