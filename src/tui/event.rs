//! Key handling for the live queue view

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::tui::state::{EventResult, ViewerState};

/// Key action mappings for the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Navigation
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    MoveToTop,
    MoveToBottom,

    Refresh,
    Quit,
    /// Ctrl+C; raw mode delivers it as a key instead of a signal
    Interrupt,

    Unknown,
}

impl KeyAction {
    /// Map a key event to an action
    pub fn from_key_event(event: KeyEvent) -> Self {
        let KeyEvent {
            code,
            modifiers,
            kind,
            ..
        } = event;

        if kind == KeyEventKind::Release {
            return KeyAction::Unknown;
        }

        match code {
            // Ctrl+ combinations must come before bare character matches
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Interrupt,
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageDown,
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageUp,

            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Refresh,

            KeyCode::Char('j') | KeyCode::Down => KeyAction::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => KeyAction::ScrollUp,
            KeyCode::Char('g') | KeyCode::Home => KeyAction::MoveToTop,
            KeyCode::Char('G') | KeyCode::End => KeyAction::MoveToBottom,
            KeyCode::PageDown => KeyAction::PageDown,
            KeyCode::PageUp => KeyAction::PageUp,

            _ => KeyAction::Unknown,
        }
    }

    /// Apply the action to the view state
    pub fn apply(self, state: &mut ViewerState) -> EventResult {
        let before = state.offset();
        match self {
            KeyAction::ScrollUp => state.scroll_up(),
            KeyAction::ScrollDown => state.scroll_down(),
            KeyAction::PageUp => state.page_up(),
            KeyAction::PageDown => state.page_down(),
            KeyAction::MoveToTop => state.scroll_to_top(),
            KeyAction::MoveToBottom => state.scroll_to_bottom(),
            KeyAction::Refresh => return EventResult::Refresh,
            KeyAction::Quit => return EventResult::Quit,
            KeyAction::Interrupt => return EventResult::Interrupted,
            KeyAction::Unknown => return EventResult::Unchanged,
        }

        if state.offset() == before {
            EventResult::Unchanged
        } else {
            EventResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_action_quit_and_refresh() {
        assert_eq!(KeyAction::from_key_event(key(KeyCode::Char('q'))), KeyAction::Quit);
        assert_eq!(KeyAction::from_key_event(key(KeyCode::Char('r'))), KeyAction::Refresh);
    }

    #[test]
    fn test_key_action_navigation() {
        assert_eq!(KeyAction::from_key_event(key(KeyCode::Char('j'))), KeyAction::ScrollDown);
        assert_eq!(KeyAction::from_key_event(key(KeyCode::Up)), KeyAction::ScrollUp);
        assert_eq!(KeyAction::from_key_event(key(KeyCode::End)), KeyAction::MoveToBottom);
        assert_eq!(KeyAction::from_key_event(key(KeyCode::PageDown)), KeyAction::PageDown);
    }

    #[test]
    fn test_ctrl_c_is_interrupt() {
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(KeyAction::from_key_event(event), KeyAction::Interrupt);
        // Bare 'c' means nothing here
        assert_eq!(KeyAction::from_key_event(key(KeyCode::Char('c'))), KeyAction::Unknown);
    }

    #[test]
    fn test_release_events_ignored() {
        let mut event = key(KeyCode::Char('q'));
        event.kind = KeyEventKind::Release;
        assert_eq!(KeyAction::from_key_event(event), KeyAction::Unknown);
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut state = ViewerState::new(2, 1);
        state.replace_lines((0..5).map(|i| i.to_string()).collect(), Instant::now());

        assert_eq!(KeyAction::ScrollUp.apply(&mut state), EventResult::Unchanged);
        assert_eq!(KeyAction::ScrollDown.apply(&mut state), EventResult::Continue);
        assert_eq!(state.offset(), 1);
        assert_eq!(KeyAction::Unknown.apply(&mut state), EventResult::Unchanged);
        assert_eq!(KeyAction::Quit.apply(&mut state), EventResult::Quit);
    }
}
