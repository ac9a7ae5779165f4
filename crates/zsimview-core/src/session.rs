//! Session driver: one open container, the current snapshot and selection.
//!
//! Every operation runs normalize -> re-resolve -> materialize synchronously
//! and leaves a consistent state behind; front ends read it through
//! [`Session::view`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::container::{Container, FileRole};
use crate::error::{SchemaWarning, SelectError, ViewerError};
use crate::schema::{NormalizedSchema, normalize};
use crate::selection::{Selection, SelectionState, StaleReason};
use crate::snapshot::{SnapshotInfo, enumerate};
use crate::view::{Grid, GridStatus, materialize};

// ============================================================
// ViewState: plain data handed to renderers
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    pub name: String,
    pub kind: String,
    pub selected: bool,
    /// Remembered stale selection not present in this snapshot.
    pub ghost: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleView {
    pub name: String,
    pub records: Vec<RecordView>,
    pub selected: bool,
    pub ghost: bool,
}

/// Snapshot of everything a front end paints.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub file: Option<String>,
    pub format: Option<&'static str>,
    pub role: Option<FileRole>,
    pub snapshots: Vec<String>,
    pub current: Option<usize>,
    pub modules: Vec<ModuleView>,
    pub selection: Option<String>,
    pub stale: bool,
    pub grid: Grid,
    pub warnings: Vec<String>,
    pub status: String,
}

// ============================================================
// Session
// ============================================================

pub struct Session {
    config: ViewerConfig,
    container: Option<Container>,
    snapshots: Vec<SnapshotInfo>,
    current: Option<usize>,
    schema: Option<NormalizedSchema>,
    warnings: Vec<SchemaWarning>,
    selection: SelectionState,
    grid: Grid,
}

impl Session {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            container: None,
            snapshots: Vec::new(),
            current: None,
            schema: None,
            warnings: Vec::new(),
            selection: SelectionState::Unselected,
            grid: Grid::empty("no file open"),
        }
    }

    /// Opens `path`, replacing the current container only on success.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), ViewerError> {
        let container = Container::open(path, &self.config)?;
        self.install(container)
    }

    /// Installs an already opened container (in-memory trees, tests).
    /// Fails without touching the current state when the root cannot be listed.
    pub fn install(&mut self, container: Container) -> Result<(), ViewerError> {
        let snapshots = enumerate(&container, &self.config)?;
        info!(
            file = %container.file_name(),
            snapshots = snapshots.len(),
            "container installed"
        );

        if let Some(old) = self.container.replace(container) {
            old.close();
        }
        self.snapshots = snapshots;
        self.current = None;
        self.schema = None;
        self.warnings.clear();
        self.selection = SelectionState::Unselected;

        if self.snapshots.is_empty() {
            self.grid = Grid::empty("file has no snapshots");
            Ok(())
        } else {
            self.switch_snapshot(0)
        }
    }

    pub fn close(&mut self) {
        if let Some(container) = self.container.take() {
            container.close();
        }
        self.snapshots.clear();
        self.current = None;
        self.schema = None;
        self.warnings.clear();
        self.selection = SelectionState::Unselected;
        self.grid = Grid::empty("no file open");
    }

    /// Moves to snapshot `index`, re-resolving the selection against it.
    pub fn switch_snapshot(&mut self, index: usize) -> Result<(), ViewerError> {
        let Some(container) = self.container.as_ref() else {
            return Err(ViewerError::MissingNode(format!("snapshot {}", index)));
        };
        let Some(snapshot) = self.snapshots.get(index) else {
            return Err(ViewerError::MissingNode(format!("snapshot {}", index)));
        };

        let (schema, warnings) = match normalize(container, snapshot) {
            Ok(result) => result,
            Err(e) => {
                warn!(snapshot = index, error = %e, "snapshot unreadable");
                let warning = SchemaWarning {
                    snapshot: index,
                    path: snapshot.path.to_string(),
                    reason: e.to_string(),
                };
                (
                    NormalizedSchema {
                        snapshot: index,
                        modules: Vec::new(),
                    },
                    vec![warning],
                )
            }
        };

        let previous = std::mem::take(&mut self.selection);
        self.selection = previous.switch_snapshot(&schema);
        self.current = Some(index);
        self.schema = Some(schema);
        self.warnings = warnings;
        self.refresh(false);
        debug!(snapshot = index, stale = self.selection.is_stale(), "switched snapshot");
        Ok(())
    }

    /// Next snapshot; returns false at the end.
    pub fn advance(&mut self) -> Result<bool, ViewerError> {
        match self.current {
            Some(i) if i + 1 < self.snapshots.len() => self.switch_snapshot(i + 1).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Previous snapshot; returns false at the start.
    pub fn rewind(&mut self) -> Result<bool, ViewerError> {
        match self.current {
            Some(i) if i > 0 => self.switch_snapshot(i - 1).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Selects (module, record) in the current snapshot. State is unchanged
    /// on error.
    pub fn select(&mut self, selection: Selection) -> Result<(), SelectError> {
        let schema = self.schema.as_ref().ok_or(SelectError::NoSnapshot)?;
        self.selection = self.selection.select(schema, selection)?;
        self.refresh(false);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = std::mem::take(&mut self.selection).clear();
        self.refresh(false);
    }

    /// Materializes a deferred grid. Returns false when nothing was deferred.
    pub fn load_deferred(&mut self) -> bool {
        if !matches!(self.grid.status, GridStatus::Deferred { .. }) {
            return false;
        }
        self.refresh(true);
        true
    }

    fn refresh(&mut self, force: bool) {
        self.grid = match self.container.as_ref() {
            Some(container) => materialize(container, &self.selection, &self.config, force),
            None => Grid::empty("no file open"),
        };
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn snapshots(&self) -> &[SnapshotInfo] {
        &self.snapshots
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn schema(&self) -> Option<&NormalizedSchema> {
        self.schema.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            file: self.container.as_ref().map(|c| c.file_name()),
            format: self.container.as_ref().map(|c| c.format_name()),
            role: self.container.as_ref().and_then(|c| c.role()),
            snapshots: self.snapshots.iter().map(|s| s.label()).collect(),
            current: self.current,
            modules: self.module_views(),
            selection: self.selection.selection().map(|s| s.to_string()),
            stale: self.selection.is_stale(),
            grid: self.grid.clone(),
            warnings: self.warnings.iter().map(|w| w.to_string()).collect(),
            status: self.status_line(),
        }
    }

    fn module_views(&self) -> Vec<ModuleView> {
        let Some(schema) = self.schema.as_ref() else {
            return Vec::new();
        };
        let target = self.selection.target();
        let selected_module = self.selection.selection().map(|s| s.module.as_str());

        let mut modules: Vec<ModuleView> = schema
            .modules
            .iter()
            .map(|m| {
                let is_module = target.is_some() && selected_module == Some(m.name.as_str());
                ModuleView {
                    name: m.name.clone(),
                    selected: is_module,
                    ghost: false,
                    records: m
                        .records
                        .iter()
                        .map(|r| RecordView {
                            name: r.name.clone(),
                            kind: r.record.kind_label(),
                            selected: is_module
                                && target.is_some_and(|t| t.record_name == r.name),
                            ghost: false,
                        })
                        .collect(),
                }
            })
            .collect();

        if let SelectionState::Stale {
            selection,
            last,
            reason,
        } = &self.selection
        {
            let ghost = RecordView {
                name: selection.record.to_string(),
                kind: last.kind_label(),
                selected: false,
                ghost: true,
            };
            match (reason, modules.iter_mut().find(|m| m.name == selection.module)) {
                (StaleReason::ModuleMissing, _) | (_, None) => modules.push(ModuleView {
                    name: selection.module.clone(),
                    records: vec![ghost],
                    selected: false,
                    ghost: true,
                }),
                (StaleReason::RecordMissing, Some(module)) => module.records.push(ghost),
                (_, Some(module)) => {
                    if let Some(record) = module.records.iter_mut().find(|r| r.name == ghost.name) {
                        record.ghost = true;
                    }
                }
            }
        }
        modules
    }

    fn status_line(&self) -> String {
        let Some(container) = self.container.as_ref() else {
            return "no file open".to_string();
        };
        let position = match self.current {
            Some(i) => format!("snapshot {}/{}", i + 1, self.snapshots.len()),
            None => "no snapshots".to_string(),
        };
        let selection = match &self.selection {
            SelectionState::Unselected => "nothing selected".to_string(),
            SelectionState::Selected { selection, .. } => selection.to_string(),
            SelectionState::Stale {
                selection, reason, ..
            } => format!("{} (stale: {})", selection, reason),
        };
        let mut line = format!(
            "{} [{}] {} | {}",
            container.file_name(),
            container.format_name(),
            position,
            selection
        );
        if !self.warnings.is_empty() {
            line.push_str(&format!(" | {} warning(s)", self.warnings.len()));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DataType, FieldDef, Node, Value, write_container};
    use tempfile::tempdir;

    fn core_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("instrs", DataType::u64()),
            FieldDef::new("cycles", DataType::u64()),
        ]
    }

    fn core(scale: u64) -> Node {
        let rows = (0..4u64)
            .map(|i| vec![Value::UInt(scale * (i + 1)), Value::UInt(1000)])
            .collect();
        Node::compound_array("core", core_fields(), rows)
    }

    fn cache() -> Node {
        Node::compound_array(
            "cache",
            vec![FieldDef::new("hits", DataType::u64())],
            vec![vec![Value::UInt(9)], vec![Value::UInt(11)]],
        )
    }

    /// Two snapshots; the second changes `core` values and drops `cache`.
    fn two_snapshots() -> Node {
        Node::group("/")
            .with_child(
                Node::group("0")
                    .with_attr("phase", Value::Int(5))
                    .with_child(core(10))
                    .with_child(cache()),
            )
            .with_child(
                Node::group("1")
                    .with_attr("phase", Value::Int(2))
                    .with_child(core(20)),
            )
    }

    fn memory_session() -> Session {
        let config = ViewerConfig::default();
        let mut session = Session::new(config.clone());
        session
            .install(Container::from_tree("zsim.zsv", two_snapshots(), &config))
            .unwrap();
        session
    }

    fn column(grid: &Grid, col: usize) -> Vec<String> {
        grid.rows.iter().map(|r| r.cells[col].clone()).collect()
    }

    fn check_core_follows_snapshot(session: &mut Session) {
        session.select(Selection::parse("core:*")).unwrap();
        assert_eq!(session.grid().line_count(), 5);
        assert_eq!(column(session.grid(), 0), vec!["10", "20", "30", "40"]);

        session.switch_snapshot(1).unwrap();
        assert!(session.selection().is_selected());
        let grid = session.grid();
        assert_eq!(grid.line_count(), 5);
        assert_eq!(grid.headers, vec!["instrs", "cycles"]);
        assert_eq!(column(grid, 0), vec!["20", "40", "60", "80"]);
    }

    fn check_dropped_module_goes_stale_and_back(session: &mut Session) {
        session.switch_snapshot(0).unwrap();
        session.select(Selection::parse("cache:*")).unwrap();
        let original = session.grid().clone();
        assert_eq!(original.rows.len(), 2);

        session.switch_snapshot(1).unwrap();
        assert!(session.selection().is_stale());
        assert!(session.grid().is_empty());

        session.switch_snapshot(0).unwrap();
        assert!(session.selection().is_selected());
        assert_eq!(session.grid(), &original);
    }

    #[test]
    fn test_core_values_follow_snapshot_in_memory() {
        check_core_follows_snapshot(&mut memory_session());
    }

    #[test]
    fn test_dropped_module_in_memory() {
        check_dropped_module_goes_stale_and_back(&mut memory_session());
    }

    #[test]
    fn test_end_to_end_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zsim.zsv");
        write_container(&path, &two_snapshots()).unwrap();

        let mut session = Session::new(ViewerConfig::default());
        session.open(&path).unwrap();
        assert_eq!(session.view().format, Some("native"));
        assert_eq!(session.view().role, Some(FileRole::Primary));
        check_core_follows_snapshot(&mut session);
        check_dropped_module_goes_stale_and_back(&mut session);
    }

    /// Same-named snapshots behind a top-level dataset: position, not name,
    /// identifies each one.
    fn repeated_names() -> Node {
        Node::group("/")
            .with_child(Node::scalar("version", Value::UInt(2)))
            .with_child(Node::group("dump").with_child(core(1)))
            .with_child(Node::group("dump").with_child(core(7)))
    }

    fn check_repeated_names_stay_distinct(session: &mut Session) {
        assert_eq!(session.snapshots().len(), 2);
        session.select(Selection::whole("core")).unwrap();
        assert_eq!(column(session.grid(), 0), vec!["1", "2", "3", "4"]);

        session.switch_snapshot(1).unwrap();
        assert!(session.selection().is_selected());
        assert_eq!(column(session.grid(), 0), vec!["7", "14", "21", "28"]);

        session.rewind().unwrap();
        assert_eq!(column(session.grid(), 0), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_repeated_snapshot_names_in_memory() {
        let config = ViewerConfig::default();
        let mut session = Session::new(config.clone());
        session
            .install(Container::from_tree("zsim.zsv", repeated_names(), &config))
            .unwrap();
        check_repeated_names_stay_distinct(&mut session);
    }

    #[test]
    fn test_repeated_snapshot_names_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zsim.zsv");
        write_container(&path, &repeated_names()).unwrap();

        let mut session = Session::new(ViewerConfig::default());
        session.open(&path).unwrap();
        check_repeated_names_stay_distinct(&mut session);
    }

    #[test]
    fn test_failed_open_keeps_previous_container() {
        let mut session = memory_session();
        session.select(Selection::whole("core")).unwrap();
        let err = session.open("/nonexistent/zsim.h5").unwrap_err();
        assert!(matches!(err, ViewerError::NotFound(_)));
        assert_eq!(session.view().file.as_deref(), Some("zsim.zsv"));
        assert!(session.selection().is_selected());
        assert_eq!(session.grid().rows.len(), 4);
    }

    #[test]
    fn test_advance_and_rewind_stop_at_edges() {
        let mut session = memory_session();
        assert_eq!(session.current(), Some(0));
        assert!(!session.rewind().unwrap());
        assert!(session.advance().unwrap());
        assert_eq!(session.current(), Some(1));
        assert!(!session.advance().unwrap());
        assert!(session.switch_snapshot(7).is_err());
        assert_eq!(session.current(), Some(1));
    }

    #[test]
    fn test_select_errors_leave_state() {
        let mut session = memory_session();
        session.select(Selection::whole("core")).unwrap();
        assert_eq!(
            session.select(Selection::whole("nope")),
            Err(SelectError::UnknownModule("nope".into()))
        );
        assert!(session.selection().is_selected());

        let mut empty = Session::new(ViewerConfig::default());
        assert_eq!(
            empty.select(Selection::whole("core")),
            Err(SelectError::NoSnapshot)
        );
    }

    #[test]
    fn test_view_lists_ghost_for_stale_module() {
        let mut session = memory_session();
        session.select(Selection::whole("cache")).unwrap();
        session.advance().unwrap();
        let view = session.view();
        assert!(view.stale);
        assert_eq!(view.selection.as_deref(), Some("cache:*"));
        let ghost = view.modules.last().unwrap();
        assert_eq!(ghost.name, "cache");
        assert!(ghost.ghost);
        assert!(view.status.contains("stale"));
        assert_eq!(view.snapshots, vec!["0: phase=5, time=?", "1: phase=2, time=?"]);
    }

    #[test]
    fn test_view_marks_selected_record() {
        let mut session = memory_session();
        session.select(Selection::whole("core")).unwrap();
        let view = session.view();
        let core = view.modules.iter().find(|m| m.name == "core").unwrap();
        assert!(core.selected);
        assert!(core.records[0].selected);
        assert_eq!(core.records[0].kind, "array[4]");
        assert!(!view.modules.iter().any(|m| m.ghost));
    }

    #[test]
    fn test_load_deferred() {
        let config = ViewerConfig::default().with_eager_row_limit(3);
        let mut session = Session::new(config.clone());
        session
            .install(Container::from_tree("zsim.zsv", two_snapshots(), &config))
            .unwrap();
        session.select(Selection::whole("core")).unwrap();
        assert_eq!(session.grid().status, GridStatus::Deferred { rows: 4 });
        assert!(session.load_deferred());
        assert_eq!(session.grid().rows.len(), 4);
        assert!(!session.load_deferred());
    }

    #[test]
    fn test_close_and_clear() {
        let mut session = memory_session();
        session.select(Selection::whole("core")).unwrap();
        session.clear_selection();
        assert!(session.grid().is_empty());
        session.close();
        assert!(session.container().is_none());
        assert_eq!(session.view().status, "no file open");
    }
}
