//! Table pane: paints the materialized grid or its placeholder.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Cell, Paragraph, Row, Table};

use crate::fmt::truncate;
use crate::tui::state::{AppState, Pane};
use crate::tui::style::Styles;
use crate::view::{GridStatus, RowStyleClass};

use super::pane_block;

pub fn render_grid(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let styles = Styles::new(state.light);
    let grid = &state.view.grid;
    let title = if grid.title.is_empty() {
        Pane::Grid.name().to_string()
    } else {
        grid.title.clone()
    };
    let block = pane_block(title, Pane::Grid, state.pane, styles);

    // Placeholder-only grids (empty, failed) have no header to draw.
    if grid.headers.is_empty() {
        let text = grid.message().unwrap_or_default();
        let style = match grid.status {
            GridStatus::Failed(_) => styles.warning(),
            _ => styles.dim(),
        };
        let paragraph = Paragraph::new(Line::from(text))
            .style(style)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let mut header_cells = vec![Cell::from("")];
    header_cells.extend(
        grid.headers
            .iter()
            .zip(&grid.widths)
            .map(|(h, w)| Cell::from(truncate(h, *w as usize))),
    );
    let header = Row::new(header_cells)
        .style(styles.table_header())
        .height(1);

    let mut rows: Vec<Row> = grid
        .rows
        .iter()
        .map(|row| {
            let style = match row.style {
                RowStyleClass::Normal => styles.default(),
                RowStyleClass::Total => styles.total(),
                RowStyleClass::Raw => styles.dim(),
            };
            let mut cells = vec![Cell::from(row.label.clone())];
            cells.extend(
                row.cells
                    .iter()
                    .zip(&grid.widths)
                    .map(|(c, w)| Cell::from(truncate(c, *w as usize))),
            );
            Row::new(cells).style(style).height(1)
        })
        .collect();

    // Deferred grids show the header plus the load hint.
    if let Some(message) = grid.message() {
        rows.push(Row::new(vec![Cell::from(""), Cell::from(message)]).style(styles.warning()));
    }

    let mut constraints = vec![Constraint::Length(grid.label_width.max(3))];
    constraints.extend(grid.widths.iter().map(|&w| Constraint::Length(w)));

    let table = Table::new(rows, constraints)
        .header(header)
        .block(block)
        .column_spacing(2)
        .row_highlight_style(styles.selected());

    state
        .grid
        .ratatui_state
        .select((!state.view.grid.rows.is_empty()).then_some(state.grid.selected));
    frame.render_stateful_widget(table, area, &mut state.grid.ratatui_state);
}
