//! Header bar (file, role, position) and status bar.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::state::{AppState, Pane};
use crate::tui::style::Styles;

pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let styles = Styles::new(state.light);
    let chunks = Layout::horizontal([
        Constraint::Min(20),    // File
        Constraint::Length(30), // Panes
        Constraint::Length(24), // Position
    ])
    .split(area);

    let view = &state.view;
    let file = match (&view.file, view.format) {
        (Some(file), Some(format)) => {
            let role = view.role.map(|r| r.name()).unwrap_or("-");
            format!(" {} [{}, {}]", file, format, role)
        }
        _ => " no file".to_string(),
    };
    frame.render_widget(Paragraph::new(file).style(styles.header()), chunks[0]);

    let panes: Vec<Span> = Pane::all()
        .iter()
        .map(|p| {
            let style = if *p == state.pane {
                styles.active()
            } else {
                styles.dim()
            };
            Span::styled(format!(" {} ", p.name()), style)
        })
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(panes)).style(styles.header()),
        chunks[1],
    );

    let position = match view.current {
        Some(i) => format!(" snapshot {}/{} ", i + 1, view.snapshots.len()),
        None => " - ".to_string(),
    };
    frame.render_widget(Paragraph::new(position).style(styles.header()), chunks[2]);
}

/// Bottom line: transient message if any, else the session status.
pub fn render_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let styles = Styles::new(state.light);
    let line = match state.message() {
        Some(message) => Line::from(Span::styled(format!(" {}", message), styles.warning())),
        None => {
            let mut spans = vec![Span::raw(format!(" {}", state.view.status))];
            if let Some(first) = state.view.warnings.first() {
                spans.push(Span::styled(format!("  {}", first), styles.warning()));
            }
            spans.push(Span::styled("  ? help", styles.dim()));
            Line::from(spans)
        }
    };
    frame.render_widget(Paragraph::new(line).style(styles.header()), area);
}
