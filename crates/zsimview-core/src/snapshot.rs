//! Snapshot index: top-level groups in declaration order with a phase/time
//! preview taken from recognized attribute or leaf names.

use tracing::{debug, warn};

use crate::config::ViewerConfig;
use crate::container::{Attribute, ChildEntry, Container, LeafData, NodeKind, NodePath, Value};
use crate::error::ViewerError;
use crate::fmt::format_number;

/// One snapshot. Identity is `index` (position among top-level groups);
/// names may repeat across producers.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInfo {
    pub index: usize,
    pub name: String,
    pub path: NodePath,
    pub phase: Option<i64>,
    pub time: Option<f64>,
    /// Set when the preview could not be read; the snapshot stays listed.
    pub preview_error: Option<String>,
}

impl SnapshotInfo {
    /// List label: `3: phase=5, time=12000`, or `3: <name>` without a preview.
    pub fn label(&self) -> String {
        if self.phase.is_none() && self.time.is_none() {
            return format!("{}: {}", self.index, self.name);
        }
        let phase = self
            .phase
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        let time = self
            .time
            .map(|t| format_number(t, 3))
            .unwrap_or_else(|| "?".to_string());
        format!("{}: phase={}, time={}", self.index, phase, time)
    }
}

/// Lists snapshots in file declaration order, never re-sorted by phase or time.
///
/// Only a failure to list the root is fatal; a snapshot whose preview cannot
/// be read is still listed with an empty preview.
pub fn enumerate(
    container: &Container,
    config: &ViewerConfig,
) -> Result<Vec<SnapshotInfo>, ViewerError> {
    let root = NodePath::root();
    let mut snapshots = Vec::new();

    for (position, entry) in container.list_children(&root)?.into_iter().enumerate() {
        if entry.kind != NodeKind::Group {
            debug!(name = %entry.name, "skipping top-level dataset");
            continue;
        }
        let path = NodePath::top_level(position, &entry.name);
        let index = snapshots.len();
        let (phase, time, preview_error) = match read_preview(container, &path, config) {
            Ok((phase, time)) => (phase, time, None),
            Err(e) => {
                warn!(snapshot = index, path = %path, error = %e, "snapshot preview unavailable");
                (None, None, Some(e.to_string()))
            }
        };
        snapshots.push(SnapshotInfo {
            index,
            name: entry.name,
            path,
            phase,
            time,
            preview_error,
        });
    }

    debug!(count = snapshots.len(), "snapshots enumerated");
    Ok(snapshots)
}

fn read_preview(
    container: &Container,
    path: &NodePath,
    config: &ViewerConfig,
) -> Result<(Option<i64>, Option<f64>), ViewerError> {
    let attrs = container.attributes(path)?;
    let children = container.list_children(path)?;
    let phase = lookup(container, path, &attrs, &children, &config.phase_keys)?
        .and_then(|v| v.as_i64());
    let time = lookup(container, path, &attrs, &children, &config.time_keys)?
        .and_then(|v| v.as_f64());
    Ok((phase, time))
}

/// First recognized key found as an attribute, then as a direct child leaf.
fn lookup(
    container: &Container,
    path: &NodePath,
    attrs: &[Attribute],
    children: &[ChildEntry],
    keys: &[String],
) -> Result<Option<Value>, ViewerError> {
    for key in keys {
        if let Some(attr) = attrs.iter().find(|a| &a.name == key) {
            return Ok(preview_value(&attr.value));
        }
        if children
            .iter()
            .any(|c| &c.name == key && c.kind == NodeKind::Dataset)
        {
            let leaf = container.read_leaf(&path.child(key))?;
            return Ok(leaf_preview(&leaf));
        }
    }
    Ok(None)
}

/// Scalars preview as themselves; arrays by their last element (the
/// simulator stores `time` as a multi-element counter array).
fn preview_value(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.last().and_then(preview_value),
        Value::Compound(_) => None,
        other => Some(other.clone()),
    }
}

fn leaf_preview(leaf: &LeafData) -> Option<Value> {
    if leaf.descriptor.shape.len() > 1 {
        return None;
    }
    leaf.values.last().and_then(preview_value)
}
