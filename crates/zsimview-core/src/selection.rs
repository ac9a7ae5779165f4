//! Selection state machine: `Unselected`, `Selected`, `Stale`.
//!
//! A [`Selection`] is logical (names only). Every snapshot change re-resolves
//! it against that snapshot's [`NormalizedSchema`]; a structural mismatch
//! moves it to `Stale`, which is ordinary state and not an error.

use std::fmt;

use tracing::debug;

use crate::classify::Record;
use crate::container::NodePath;
use crate::error::SelectError;
use crate::schema::{ModuleSchema, NormalizedSchema, RecordEntry};

/// Token that selects a module's only record.
pub const WHOLE_RECORD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordRef {
    /// The module's single record (`*`).
    Whole,
    Named(String),
}

impl RecordRef {
    pub fn parse(s: &str) -> Self {
        if s.is_empty() || s == WHOLE_RECORD {
            RecordRef::Whole
        } else {
            RecordRef::Named(s.to_string())
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Whole => f.write_str(WHOLE_RECORD),
            RecordRef::Named(name) => f.write_str(name),
        }
    }
}

/// User-chosen (module, record) pair, independent of any snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub module: String,
    pub record: RecordRef,
}

impl Selection {
    pub fn new(module: impl Into<String>, record: RecordRef) -> Self {
        Self {
            module: module.into(),
            record,
        }
    }

    pub fn whole(module: impl Into<String>) -> Self {
        Self::new(module, RecordRef::Whole)
    }

    pub fn named(module: impl Into<String>, record: impl Into<String>) -> Self {
        Self::new(module, RecordRef::Named(record.into()))
    }

    /// Parses `module` or `module:record`; `module:*` selects the whole module.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((module, record)) => Self::new(module, RecordRef::parse(record)),
            None => Self::whole(s),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.record)
    }
}

/// A selection bound to one snapshot's record.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub snapshot: usize,
    pub record_name: String,
    pub path: NodePath,
    pub record: Record,
}

/// Why a selection could not be bound to the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    ModuleMissing,
    RecordMissing,
    /// Name found but the shape is not compatible with the last bound one.
    ShapeChanged { was: String, now: String },
    /// `*` on a module that now has several records.
    Ambiguous(usize),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::ModuleMissing => write!(f, "module not present in this snapshot"),
            StaleReason::RecordMissing => write!(f, "record not present in this snapshot"),
            StaleReason::ShapeChanged { was, now } => {
                write!(f, "record changed shape ({} -> {})", was, now)
            }
            StaleReason::Ambiguous(n) => write!(f, "module now has {} records", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected {
        selection: Selection,
        target: Target,
    },
    /// Remembered selection that does not resolve in the current snapshot.
    /// `last` is the shape it was bound to, used to judge re-appearance.
    Stale {
        selection: Selection,
        last: Record,
        reason: StaleReason,
    },
}

impl SelectionState {
    /// Binds `selection` in `schema`. Fails without changing state when the
    /// module or record does not exist there.
    pub fn select(
        &self,
        schema: &NormalizedSchema,
        selection: Selection,
    ) -> Result<SelectionState, SelectError> {
        let module = schema
            .module(&selection.module)
            .ok_or_else(|| SelectError::UnknownModule(selection.module.clone()))?;
        let entry = match resolve_record(module, &selection.record) {
            Ok(entry) => entry,
            Err(StaleReason::Ambiguous(records)) => {
                return Err(SelectError::AmbiguousWhole {
                    module: selection.module.clone(),
                    records,
                });
            }
            Err(_) => {
                return Err(SelectError::UnknownRecord {
                    module: selection.module.clone(),
                    record: selection.record.to_string(),
                });
            }
        };
        debug!(selection = %selection, snapshot = schema.snapshot, "selected");
        Ok(SelectionState::Selected {
            target: target(schema.snapshot, entry),
            selection,
        })
    }

    /// Re-resolves the current selection against another snapshot's schema.
    pub fn switch_snapshot(self, schema: &NormalizedSchema) -> SelectionState {
        let (selection, last) = match self {
            SelectionState::Unselected => return SelectionState::Unselected,
            SelectionState::Selected { selection, target } => (selection, target.record),
            SelectionState::Stale {
                selection, last, ..
            } => (selection, last),
        };

        let resolved = schema
            .module(&selection.module)
            .ok_or(StaleReason::ModuleMissing)
            .and_then(|module| resolve_record(module, &selection.record))
            .and_then(|entry| {
                if last.compatible_with(&entry.record) {
                    Ok(entry)
                } else {
                    Err(StaleReason::ShapeChanged {
                        was: last.kind_label(),
                        now: entry.record.kind_label(),
                    })
                }
            });

        match resolved {
            Ok(entry) => SelectionState::Selected {
                target: target(schema.snapshot, entry),
                selection,
            },
            Err(reason) => {
                debug!(selection = %selection, snapshot = schema.snapshot, reason = %reason, "selection stale");
                SelectionState::Stale {
                    selection,
                    last,
                    reason,
                }
            }
        }
    }

    pub fn clear(self) -> SelectionState {
        SelectionState::Unselected
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            SelectionState::Unselected => None,
            SelectionState::Selected { selection, .. } | SelectionState::Stale { selection, .. } => {
                Some(selection)
            }
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            SelectionState::Selected { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionState::Selected { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, SelectionState::Stale { .. })
    }
}

fn resolve_record<'a>(
    module: &'a ModuleSchema,
    record: &RecordRef,
) -> Result<&'a RecordEntry, StaleReason> {
    match record {
        RecordRef::Whole => match module.records.len() {
            0 => Err(StaleReason::RecordMissing),
            1 => Ok(&module.records[0]),
            n => Err(StaleReason::Ambiguous(n)),
        },
        RecordRef::Named(name) => module.record(name).ok_or(StaleReason::RecordMissing),
    }
}

fn target(snapshot: usize, entry: &RecordEntry) -> Target {
    Target {
        snapshot,
        record_name: entry.name.clone(),
        path: entry.path.clone(),
        record: entry.record.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FieldSchema;
    use crate::container::{DataType, FieldDef};

    fn array_record(fields: &[&str], len: usize) -> Record {
        Record::ArrayOfCompound {
            fields: FieldSchema::new(
                fields
                    .iter()
                    .map(|f| FieldDef::new(*f, DataType::u64()))
                    .collect(),
            ),
            len,
        }
    }

    fn module(name: &str, records: Vec<(&str, Record)>) -> ModuleSchema {
        ModuleSchema {
            name: name.to_string(),
            records: records
                .into_iter()
                .map(|(r, record)| RecordEntry {
                    name: r.to_string(),
                    path: NodePath::root().child(name).child(r),
                    record,
                })
                .collect(),
        }
    }

    fn schema(snapshot: usize, modules: Vec<ModuleSchema>) -> NormalizedSchema {
        NormalizedSchema { snapshot, modules }
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(Selection::parse("core"), Selection::whole("core"));
        assert_eq!(Selection::parse("core:*"), Selection::whole("core"));
        assert_eq!(
            Selection::parse("l2:mshr/full"),
            Selection::named("l2", "mshr/full")
        );
        assert_eq!(Selection::named("l2", "bank0").to_string(), "l2:bank0");
    }

    #[test]
    fn test_select_validates() {
        let s = schema(
            0,
            vec![
                module("core", vec![("core", array_record(&["instrs"], 4))]),
                module(
                    "l2",
                    vec![
                        ("a", array_record(&["hits"], 1)),
                        ("b", array_record(&["hits"], 1)),
                    ],
                ),
            ],
        );
        let state = SelectionState::Unselected;
        assert_eq!(
            state.select(&s, Selection::whole("nope")),
            Err(SelectError::UnknownModule("nope".into()))
        );
        assert_eq!(
            state.select(&s, Selection::whole("l2")),
            Err(SelectError::AmbiguousWhole {
                module: "l2".into(),
                records: 2
            })
        );
        assert!(matches!(
            state.select(&s, Selection::named("l2", "c")),
            Err(SelectError::UnknownRecord { .. })
        ));

        let selected = state.select(&s, Selection::whole("core")).unwrap();
        assert!(selected.is_selected());
        assert_eq!(selected.target().unwrap().record_name, "core");
    }

    #[test]
    fn test_switch_retargets_when_compatible() {
        let a = schema(0, vec![module("core", vec![("core", array_record(&["instrs", "cycles"], 4))])]);
        let b = schema(1, vec![module("core", vec![("core", array_record(&["cycles", "instrs"], 8))])]);
        let state = SelectionState::Unselected
            .select(&a, Selection::whole("core"))
            .unwrap()
            .switch_snapshot(&b);
        let target = state.target().unwrap();
        assert_eq!(target.snapshot, 1);
        assert!(matches!(target.record, Record::ArrayOfCompound { len: 8, .. }));
    }

    #[test]
    fn test_stale_and_recovery() {
        let a = schema(
            0,
            vec![
                module("core", vec![("core", array_record(&["instrs"], 4))]),
                module("cache", vec![("cache", array_record(&["hits"], 2))]),
            ],
        );
        let b = schema(1, vec![module("core", vec![("core", array_record(&["instrs"], 4))])]);

        let state = SelectionState::Unselected
            .select(&a, Selection::whole("cache"))
            .unwrap();
        let stale = state.switch_snapshot(&b);
        assert!(stale.is_stale());
        assert_eq!(stale.selection(), Some(&Selection::whole("cache")));
        assert!(matches!(
            stale,
            SelectionState::Stale {
                reason: StaleReason::ModuleMissing,
                ..
            }
        ));

        let back = stale.switch_snapshot(&a);
        assert!(back.is_selected());
        assert_eq!(back.target().unwrap().snapshot, 0);
    }

    #[test]
    fn test_incompatible_shape_goes_stale() {
        let a = schema(0, vec![module("core", vec![("core", array_record(&["instrs"], 4))])]);
        let b = schema(1, vec![module("core", vec![("core", array_record(&["ipc"], 4))])]);
        let c = schema(
            2,
            vec![module(
                "core",
                vec![(
                    "core",
                    Record::Scalar {
                        dtype: DataType::u64(),
                    },
                )],
            )],
        );
        let selected = SelectionState::Unselected
            .select(&a, Selection::whole("core"))
            .unwrap();
        assert!(selected.clone().switch_snapshot(&b).is_stale());
        match selected.switch_snapshot(&c) {
            SelectionState::Stale {
                reason: StaleReason::ShapeChanged { was, now },
                ..
            } => {
                assert_eq!(was, "array[4]");
                assert_eq!(now, "scalar");
            }
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[test]
    fn test_unselected_stays_unselected_and_clear() {
        let a = schema(0, vec![module("core", vec![("core", array_record(&["instrs"], 4))])]);
        assert_eq!(
            SelectionState::Unselected.switch_snapshot(&a),
            SelectionState::Unselected
        );
        let selected = SelectionState::Unselected
            .select(&a, Selection::whole("core"))
            .unwrap();
        assert_eq!(selected.clear(), SelectionState::Unselected);
    }
}
