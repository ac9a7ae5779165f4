//! Help popup widget with key bindings.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::tui::style::Styles;

const KEYS: &[(&str, &str)] = &[
    ("Tab / → / ←", "move focus between panes"),
    ("↑ ↓ PgUp PgDn", "move the cursor"),
    ("Home / End", "first / last row"),
    ("Enter", "open snapshot or select module"),
    ("n / p", "next / previous snapshot"),
    ("L", "load a deferred large table"),
    ("Esc", "clear the selection"),
    ("?", "toggle this help"),
    ("q / Ctrl-C", "quit"),
];

const NOTES: &[&str] = &[
    "The selection follows you across snapshots. When a snapshot lacks the",
    "selected module, or its shape changed, the entry is shown crossed out",
    "and the table stays empty until a compatible snapshot is shown again.",
];

/// Renders the help popup centered on screen with scroll support.
pub fn render_help(frame: &mut Frame, area: Rect, light: bool, scroll: &mut usize) {
    let styles = Styles::new(light);
    let popup_width = (area.width * 60 / 100).clamp(40, 80);
    let popup_height = (area.height * 80 / 100).clamp(10, 24);
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let mut content: Vec<Line> = KEYS
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{:>14}  ", key), styles.key()),
                Span::styled(*what, styles.default()),
            ])
        })
        .collect();
    content.push(Line::from(""));
    content.extend(NOTES.iter().map(|n| Line::from(Span::styled(*n, styles.dim()))));
    let content_lines = content.len();

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(styles.focused_border());
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::vertical([
        Constraint::Min(1),    // Content
        Constraint::Length(1), // Footer
    ])
    .split(inner);

    let visible_height = chunks[0].height as usize;
    let max_scroll = content_lines.saturating_sub(visible_height);
    if *scroll > max_scroll {
        *scroll = max_scroll;
    }

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .scroll((*scroll as u16, 0));
    frame.render_widget(paragraph, chunks[0]);

    let footer = if max_scroll > 0 {
        format!(" [{}/{}] Esc to close", *scroll + 1, max_scroll + 1)
    } else {
        " Esc to close".to_string()
    };
    frame.render_widget(
        Paragraph::new(Span::styled(footer, styles.dim())),
        chunks[1],
    );
}
