//! Input handling and keybindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::selection::Selection;

use super::navigable::Navigable;
use super::state::{AppState, Pane, PopupState};

/// Result of handling a key event; session work the app must perform.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    /// Select a module/record in the current snapshot.
    Select(Selection),
    JumpSnapshot(usize),
    NextSnapshot,
    PrevSnapshot,
    LoadDeferred,
    ClearSelection,
}

/// Navigation action for unified scroll/selection dispatch.
enum NavAction {
    Up,
    Down,
    PageUp(usize),
    PageDown(usize),
    Home,
    End,
}

fn dispatch_navigation(state: &mut AppState, action: NavAction) {
    if let PopupState::Help { scroll } = &mut state.popup {
        match action {
            NavAction::Up => *scroll = scroll.saturating_sub(1),
            NavAction::Down => *scroll = scroll.saturating_add(1),
            NavAction::PageUp(n) => *scroll = scroll.saturating_sub(n),
            NavAction::PageDown(n) => *scroll = scroll.saturating_add(n),
            NavAction::Home => *scroll = 0,
            NavAction::End => {}
        }
        return;
    }
    let pane = state.focused();
    match action {
        NavAction::Up => pane.select_up(),
        NavAction::Down => pane.select_down(),
        NavAction::PageUp(n) => pane.page_up(n),
        NavAction::PageDown(n) => pane.page_down(n),
        NavAction::Home => pane.home(),
        NavAction::End => pane.end(),
    }
}

/// Handles key input and updates state.
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }
    if matches!(state.popup, PopupState::Help { .. }) {
        return handle_help(state, key);
    }

    let page = state.page_size.max(1);
    match key.code {
        KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char('?') => state.popup = PopupState::Help { scroll: 0 },
        KeyCode::Tab | KeyCode::Right => state.pane = state.pane.next(),
        KeyCode::BackTab | KeyCode::Left => state.pane = state.pane.prev(),
        KeyCode::Up => dispatch_navigation(state, NavAction::Up),
        KeyCode::Down => dispatch_navigation(state, NavAction::Down),
        KeyCode::PageUp => dispatch_navigation(state, NavAction::PageUp(page)),
        KeyCode::PageDown => dispatch_navigation(state, NavAction::PageDown(page)),
        KeyCode::Home => dispatch_navigation(state, NavAction::Home),
        KeyCode::End => dispatch_navigation(state, NavAction::End),
        KeyCode::Enter => return activate(state),
        KeyCode::Char('n') => return KeyAction::NextSnapshot,
        KeyCode::Char('p') => return KeyAction::PrevSnapshot,
        KeyCode::Char('L') | KeyCode::Char('l') => return KeyAction::LoadDeferred,
        KeyCode::Esc => return KeyAction::ClearSelection,
        _ => {}
    }
    KeyAction::None
}

/// Enter on the focused pane.
fn activate(state: &mut AppState) -> KeyAction {
    match state.pane {
        Pane::Snapshots if !state.snapshots.is_empty() => {
            KeyAction::JumpSnapshot(state.snapshots.selected)
        }
        Pane::Modules => match state.selected_entry() {
            Some(entry) => {
                let selection = entry.selection();
                state.pane = Pane::Grid;
                KeyAction::Select(selection)
            }
            None => KeyAction::None,
        },
        _ => KeyAction::None,
    }
}

fn handle_help(state: &mut AppState, key: KeyEvent) -> KeyAction {
    let page = state.page_size.max(1);
    match key.code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => state.popup = PopupState::None,
        KeyCode::Up => dispatch_navigation(state, NavAction::Up),
        KeyCode::Down => dispatch_navigation(state, NavAction::Down),
        KeyCode::PageUp => dispatch_navigation(state, NavAction::PageUp(page)),
        KeyCode::PageDown => dispatch_navigation(state, NavAction::PageDown(page)),
        KeyCode::Home => dispatch_navigation(state, NavAction::Home),
        _ => {}
    }
    KeyAction::None
}
