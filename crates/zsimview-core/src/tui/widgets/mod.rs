//! TUI widgets.

mod grid;
mod header;
mod help;
mod lists;

pub use grid::render_grid;
pub use header::{render_header, render_status};
pub use help::render_help;
pub use lists::{render_modules, render_snapshots};

use ratatui::widgets::{Block, Borders};

use crate::tui::state::Pane;
use crate::tui::style::Styles;

/// Bordered pane block, highlighted when focused.
pub(crate) fn pane_block(title: String, pane: Pane, focused: Pane, styles: Styles) -> Block<'static> {
    let border = if pane == focused {
        styles.focused_border()
    } else {
        styles.border()
    };
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(border)
}
