//! Application state management.

use ratatui::widgets::TableState;

use crate::selection::{RecordRef, Selection};
use crate::session::{ModuleView, ViewState};

use super::navigable::Navigable;

/// Ticks a transient status message stays visible.
const MESSAGE_TICKS: u8 = 12;

/// Focusable panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pane {
    Snapshots,
    #[default]
    Modules,
    Grid,
}

impl Pane {
    pub fn all() -> &'static [Pane] {
        &[Pane::Snapshots, Pane::Modules, Pane::Grid]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pane::Snapshots => "Snapshots",
            Pane::Modules => "Modules",
            Pane::Grid => "Table",
        }
    }

    pub fn next(&self) -> Pane {
        match self {
            Pane::Snapshots => Pane::Modules,
            Pane::Modules => Pane::Grid,
            Pane::Grid => Pane::Snapshots,
        }
    }

    pub fn prev(&self) -> Pane {
        match self {
            Pane::Snapshots => Pane::Grid,
            Pane::Modules => Pane::Snapshots,
            Pane::Grid => Pane::Modules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    None,
    Help {
        scroll: usize,
    },
}

/// Cursor plus ratatui scroll state of one pane.
#[derive(Debug, Clone, Default)]
pub struct PaneCursor {
    pub selected: usize,
    pub len: usize,
    pub ratatui_state: TableState,
}

impl PaneCursor {
    fn resize(&mut self, len: usize) {
        self.len = len;
        self.clamp_cursor();
    }
}

impl Navigable for PaneCursor {
    fn cursor(&self) -> usize {
        self.selected
    }

    fn cursor_mut(&mut self) -> &mut usize {
        &mut self.selected
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// One selectable line of the modules pane.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEntry {
    pub module: String,
    pub record: RecordRef,
    pub label: String,
    pub kind: String,
    pub selected: bool,
    pub ghost: bool,
}

impl ModuleEntry {
    pub fn selection(&self) -> Selection {
        Selection::new(self.module.clone(), self.record.clone())
    }
}

/// Flattens modules into selectable lines. A module whose only record carries
/// its own name is a single line selecting the whole module.
pub fn module_entries(modules: &[ModuleView]) -> Vec<ModuleEntry> {
    let mut entries = Vec::new();
    for module in modules {
        match module.records.as_slice() {
            [] => entries.push(ModuleEntry {
                module: module.name.clone(),
                record: RecordRef::Whole,
                label: module.name.clone(),
                kind: "empty".to_string(),
                selected: false,
                ghost: module.ghost,
            }),
            [only] if only.name == module.name || only.name == "*" => entries.push(ModuleEntry {
                module: module.name.clone(),
                record: RecordRef::Whole,
                label: module.name.clone(),
                kind: only.kind.clone(),
                selected: only.selected,
                ghost: module.ghost || only.ghost,
            }),
            records => entries.extend(records.iter().map(|r| ModuleEntry {
                module: module.name.clone(),
                record: RecordRef::parse(&r.name),
                label: format!("{}/{}", module.name, r.name),
                kind: r.kind.clone(),
                selected: r.selected,
                ghost: module.ghost || r.ghost,
            })),
        }
    }
    entries
}

/// Complete TUI state; rebuilt from the session's [`ViewState`] after every action.
pub struct AppState {
    pub pane: Pane,
    pub popup: PopupState,
    pub snapshots: PaneCursor,
    pub modules: PaneCursor,
    pub grid: PaneCursor,
    pub view: ViewState,
    pub entries: Vec<ModuleEntry>,
    pub light: bool,
    /// Rows moved by PgUp/PgDn; updated from the terminal height.
    pub page_size: usize,
    message: Option<(String, u8)>,
}

impl AppState {
    pub fn new(view: ViewState, light: bool) -> Self {
        let mut state = Self {
            pane: Pane::default(),
            popup: PopupState::None,
            snapshots: PaneCursor::default(),
            modules: PaneCursor::default(),
            grid: PaneCursor::default(),
            entries: Vec::new(),
            view,
            light,
            page_size: 10,
            message: None,
        };
        state.snapshots.selected = state.view.current.unwrap_or(0);
        state.rebuild();
        state
    }

    /// Installs a fresh view, keeping cursors where they still fit.
    pub fn sync(&mut self, view: ViewState) {
        let moved = view.current != self.view.current;
        self.view = view;
        if moved {
            self.snapshots.selected = self.view.current.unwrap_or(0);
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.entries = module_entries(&self.view.modules);
        self.snapshots.resize(self.view.snapshots.len());
        self.modules.resize(self.entries.len());
        self.grid.resize(self.view.grid.rows.len());
    }

    pub fn selected_entry(&self) -> Option<&ModuleEntry> {
        self.entries.get(self.modules.selected)
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), MESSAGE_TICKS));
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(m, _)| m.as_str())
    }

    /// Ages the transient message by one tick.
    pub fn tick(&mut self) {
        if let Some((_, ttl)) = self.message.as_mut() {
            *ttl = ttl.saturating_sub(1);
            if *ttl == 0 {
                self.message = None;
            }
        }
    }

    pub fn focused(&mut self) -> &mut PaneCursor {
        match self.pane {
            Pane::Snapshots => &mut self.snapshots,
            Pane::Modules => &mut self.modules,
            Pane::Grid => &mut self.grid,
        }
    }
}
