//! UI-agnostic view model types.
//!
//! The materializer produces a [`Grid`]; any front end (the bundled TUI, the
//! dump tool) renders it without touching the container.

mod table;

pub use table::materialize;

/// Widest a data column is allowed to grow, in characters.
pub const MAX_COLUMN_WIDTH: usize = 40;

/// Row-level style classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowStyleClass {
    #[default]
    Normal,
    /// Aggregate row (TUI: bold).
    Total,
    /// Stringified raw value (TUI: dimmed).
    Raw,
}

/// One labelled data row.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub label: String,
    pub cells: Vec<String>,
    pub style: RowStyleClass,
}

/// Whether the grid carries data.
#[derive(Debug, Clone, PartialEq)]
pub enum GridStatus {
    Ready,
    /// Nothing to show (unselected, stale selection); the text is a placeholder.
    Empty(String),
    /// Large record not read yet; headers are known, `rows` is the declared length.
    Deferred { rows: usize },
    /// The leaf could not be read.
    Failed(String),
}

/// Complete table ready to be rendered by any frontend.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<GridRow>,
    /// Width of the row label column.
    pub label_width: u16,
    /// Width of each data column, same length as `headers`.
    pub widths: Vec<u16>,
    pub status: GridStatus,
}

impl Grid {
    /// The empty sentinel with a placeholder message.
    pub fn empty(placeholder: impl Into<String>) -> Self {
        Self::with_status(String::new(), Vec::new(), GridStatus::Empty(placeholder.into()))
    }

    pub(crate) fn with_status(title: String, headers: Vec<String>, status: GridStatus) -> Self {
        let mut grid = Self {
            title,
            headers,
            rows: Vec::new(),
            label_width: 0,
            widths: Vec::new(),
            status,
        };
        grid.compute_widths();
        grid
    }

    pub(crate) fn ready(title: String, headers: Vec<String>, rows: Vec<GridRow>) -> Self {
        let mut grid = Self {
            title,
            headers,
            rows,
            label_width: 0,
            widths: Vec::new(),
            status: GridStatus::Ready,
        };
        grid.compute_widths();
        grid
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.status, GridStatus::Empty(_))
    }

    pub fn is_ready(&self) -> bool {
        self.status == GridStatus::Ready
    }

    pub fn row_labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// Rows backed by the record, excluding aggregate rows.
    pub fn data_rows(&self) -> impl Iterator<Item = &GridRow> {
        self.rows.iter().filter(|r| r.style != RowStyleClass::Total)
    }

    /// Header line plus data rows; zero for the empty sentinel.
    pub fn line_count(&self) -> usize {
        if self.headers.is_empty() {
            0
        } else {
            1 + self.rows.len()
        }
    }

    /// Placeholder or status text for non-ready grids.
    pub fn message(&self) -> Option<String> {
        match &self.status {
            GridStatus::Ready => None,
            GridStatus::Empty(text) | GridStatus::Failed(text) => Some(text.clone()),
            GridStatus::Deferred { rows } => {
                Some(format!("{} rows not loaded, press L to load", rows))
            }
        }
    }

    fn compute_widths(&mut self) {
        let clamp = |n: usize| n.min(MAX_COLUMN_WIDTH) as u16;
        self.label_width = clamp(
            self.rows
                .iter()
                .map(|r| r.label.chars().count())
                .max()
                .unwrap_or(0),
        );
        self.widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let cells = self
                    .rows
                    .iter()
                    .filter_map(|r| r.cells.get(i))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0);
                clamp(cells.max(h.chars().count()).max(1))
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, cells: &[&str], style: RowStyleClass) -> GridRow {
        GridRow {
            label: label.to_string(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
            style,
        }
    }

    #[test]
    fn test_widths_from_content() {
        let long = "x".repeat(100);
        let grid = Grid::ready(
            "t".into(),
            vec!["instrs".into(), "c".into()],
            vec![
                row("core 0", &["1", "12345"], RowStyleClass::Normal),
                row("core 10", &["2", &long], RowStyleClass::Normal),
            ],
        );
        assert_eq!(grid.label_width, 7);
        assert_eq!(grid.widths, vec![6, MAX_COLUMN_WIDTH as u16]);
        assert_eq!(grid.line_count(), 3);
    }

    #[test]
    fn test_empty_sentinel() {
        let grid = Grid::empty("select a module");
        assert!(grid.is_empty());
        assert_eq!(grid.line_count(), 0);
        assert_eq!(grid.message().as_deref(), Some("select a module"));
    }

    #[test]
    fn test_data_rows_skip_total() {
        let grid = Grid::ready(
            "t".into(),
            vec!["a".into()],
            vec![
                row("SUM", &["3"], RowStyleClass::Total),
                row("core 0", &["1"], RowStyleClass::Normal),
                row("core 1", &["2"], RowStyleClass::Normal),
            ],
        );
        assert_eq!(grid.data_rows().count(), 2);
        assert_eq!(grid.row_labels(), vec!["SUM", "core 0", "core 1"]);
    }
}
