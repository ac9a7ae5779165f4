//! Schema normalizer: the module -> record table of one snapshot.

use tracing::{debug, warn};

use crate::classify::{Record, classify};
use crate::container::{Container, NodeKind, NodePath};
use crate::error::{SchemaWarning, ViewerError};
use crate::snapshot::SnapshotInfo;

/// One classified leaf inside a module.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    /// Path relative to the module, nested groups joined with `/`.
    pub name: String,
    pub path: NodePath,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSchema {
    pub name: String,
    pub records: Vec<RecordEntry>,
}

impl ModuleSchema {
    pub fn record(&self, name: &str) -> Option<&RecordEntry> {
        self.records.iter().find(|r| r.name == name)
    }

    /// The only record of a single-record module.
    pub fn sole_record(&self) -> Option<&RecordEntry> {
        match self.records.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// Normalized schema of one snapshot. Modules and records keep declaration
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSchema {
    pub snapshot: usize,
    pub modules: Vec<ModuleSchema>,
}

impl NormalizedSchema {
    pub fn module(&self, name: &str) -> Option<&ModuleSchema> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn lookup(&self, module: &str, record: &str) -> Option<&RecordEntry> {
        self.module(module)?.record(record)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn record_count(&self) -> usize {
        self.modules.iter().map(|m| m.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Walks every module of `snapshot` once, classifying each leaf from its
/// descriptor. Leaf values are never read here.
///
/// Only a failure to list the snapshot group itself is an error. A leaf that
/// cannot be described, or classifies as unsupported, becomes an
/// [`Record::Unsupported`] entry plus a [`SchemaWarning`].
pub fn normalize(
    container: &Container,
    snapshot: &SnapshotInfo,
) -> Result<(NormalizedSchema, Vec<SchemaWarning>), ViewerError> {
    let mut walker = Walker {
        container,
        snapshot: snapshot.index,
        warnings: Vec::new(),
    };
    let mut modules = Vec::new();

    for entry in container.list_children(&snapshot.path)? {
        let path = snapshot.path.child(&entry.name);
        let mut records = Vec::new();
        match entry.kind {
            NodeKind::Dataset => walker.leaf(entry.name.clone(), path, &mut records),
            NodeKind::Group => walker.group("", &path, &mut records),
        }
        modules.push(ModuleSchema {
            name: entry.name,
            records,
        });
    }

    let schema = NormalizedSchema {
        snapshot: snapshot.index,
        modules,
    };
    debug!(
        snapshot = snapshot.index,
        modules = schema.modules.len(),
        records = schema.record_count(),
        warnings = walker.warnings.len(),
        "normalized snapshot"
    );
    Ok((schema, walker.warnings))
}

struct Walker<'a> {
    container: &'a Container,
    snapshot: usize,
    warnings: Vec<SchemaWarning>,
}

impl Walker<'_> {
    fn group(&mut self, prefix: &str, path: &NodePath, out: &mut Vec<RecordEntry>) {
        let children = match self.container.list_children(path) {
            Ok(children) => children,
            Err(e) => {
                self.warn(path, e.to_string());
                return;
            }
        };
        for child in children {
            let name = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{}/{}", prefix, child.name)
            };
            let child_path = path.child(&child.name);
            match child.kind {
                NodeKind::Dataset => self.leaf(name, child_path, out),
                NodeKind::Group => self.group(&name, &child_path, out),
            }
        }
    }

    fn leaf(&mut self, name: String, path: NodePath, out: &mut Vec<RecordEntry>) {
        let record = match self.container.describe(&path) {
            Ok(desc) => classify(&desc),
            Err(e) => Record::Unsupported {
                descriptor: None,
                reason: e.to_string(),
            },
        };
        if let Record::Unsupported { reason, .. } = &record {
            self.warn(&path, reason.clone());
        }
        out.push(RecordEntry { name, path, record });
    }

    fn warn(&mut self, path: &NodePath, reason: String) {
        warn!(snapshot = self.snapshot, path = %path, reason = %reason, "schema warning");
        self.warnings.push(SchemaWarning {
            snapshot: self.snapshot,
            path: path.to_string(),
            reason,
        });
    }
}
