//! Snapshot and module list panes.

use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::widgets::{Cell, Row, Table};

use crate::fmt::truncate;
use crate::tui::state::{AppState, Pane};
use crate::tui::style::Styles;

use super::pane_block;

pub fn render_snapshots(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let styles = Styles::new(state.light);
    let current = state.view.current;
    let rows: Vec<Row> = state
        .view
        .snapshots
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let style = if Some(i) == current {
                styles.active()
            } else {
                styles.default()
            };
            Row::new(vec![Cell::from(label.clone())]).style(style)
        })
        .collect();

    let title = format!("{} ({})", Pane::Snapshots.name(), rows.len());
    let table = Table::new(rows, [Constraint::Min(10)])
        .block(pane_block(title, Pane::Snapshots, state.pane, styles))
        .row_highlight_style(styles.selected());

    state
        .snapshots
        .ratatui_state
        .select((!state.view.snapshots.is_empty()).then_some(state.snapshots.selected));
    frame.render_stateful_widget(table, area, &mut state.snapshots.ratatui_state);
}

pub fn render_modules(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let styles = Styles::new(state.light);
    let name_width = area.width.saturating_sub(14).max(8) as usize;
    let rows: Vec<Row> = state
        .entries
        .iter()
        .map(|entry| {
            let style = if entry.ghost {
                styles.ghost()
            } else if entry.selected {
                styles.active()
            } else {
                styles.default()
            };
            Row::new(vec![
                Cell::from(truncate(&entry.label, name_width)),
                Cell::from(entry.kind.clone()),
            ])
            .style(style)
        })
        .collect();

    let title = match &state.view.selection {
        Some(selection) if state.view.stale => format!("Modules - {} (stale)", selection),
        Some(selection) => format!("Modules - {}", selection),
        None => Pane::Modules.name().to_string(),
    };
    let table = Table::new(rows, [Constraint::Min(8), Constraint::Length(10)])
        .block(pane_block(title, Pane::Modules, state.pane, styles))
        .row_highlight_style(styles.selected());

    state
        .modules
        .ratatui_state
        .select((!state.entries.is_empty()).then_some(state.modules.selected));
    frame.render_stateful_widget(table, area, &mut state.modules.ratatui_state);
}
