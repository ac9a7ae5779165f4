//! Main rendering logic for TUI.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use super::state::{AppState, PopupState};
use super::widgets::{
    render_grid, render_header, render_help, render_modules, render_snapshots, render_status,
};

/// Main render function.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(5),    // Panes
        Constraint::Length(1), // Status
    ])
    .split(area);

    render_header(frame, chunks[0], state);

    let columns =
        Layout::horizontal([Constraint::Percentage(32), Constraint::Percentage(68)]).split(chunks[1]);
    let left = Layout::vertical([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(columns[0]);

    render_snapshots(frame, left[0], state);
    render_modules(frame, left[1], state);
    render_grid(frame, columns[1], state);
    render_status(frame, chunks[2], state);

    let light = state.light;
    if let PopupState::Help { scroll } = &mut state.popup {
        render_help(frame, area, light, scroll);
    }
}
