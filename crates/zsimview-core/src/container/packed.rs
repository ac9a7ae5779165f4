//! Packed-snapshot layout: one top-level 1-d compound dataset whose elements
//! are snapshots, with all modules stored as fields of a `root` compound.
//!
//! The view re-exposes each element as a virtual top-level group named by its
//! index, so the snapshot index and normalizer see ordinary groups.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::error::ViewerError;

use super::ContainerSource;
use super::tree::Attribute;
use super::types::{ChildEntry, DataType, FieldDef, LeafData, LeafDescriptor, NodeKind, NodePath, Value};

pub(super) struct PackedView {
    inner: Box<dyn ContainerSource>,
    dataset: NodePath,
    root_index: usize,
    fields: Vec<FieldDef>,
    count: usize,
    /// The packed dataset, read once on first access.
    data: RefCell<Option<Rc<LeafData>>>,
}

/// Wraps `source` in a [`PackedView`] when its root holds the configured
/// packed dataset; otherwise returns it unchanged.
pub(super) fn wrap_if_packed(
    source: Box<dyn ContainerSource>,
    config: &ViewerConfig,
) -> Box<dyn ContainerSource> {
    match detect(source.as_ref(), config) {
        Some((root_index, fields, count)) => {
            info!(
                dataset = %config.packed_dataset,
                snapshots = count,
                modules = fields.len(),
                "packed snapshot layout detected"
            );
            Box::new(PackedView {
                inner: source,
                dataset: NodePath::root().child(&config.packed_dataset),
                root_index,
                fields,
                count,
                data: RefCell::new(None),
            })
        }
        None => source,
    }
}

fn detect(
    source: &dyn ContainerSource,
    config: &ViewerConfig,
) -> Option<(usize, Vec<FieldDef>, usize)> {
    let children = source.list_children(&NodePath::root()).ok()?;
    children
        .iter()
        .find(|c| c.name == config.packed_dataset && c.kind == NodeKind::Dataset)?;
    let desc = source
        .describe(&NodePath::root().child(&config.packed_dataset))
        .ok()?;
    if desc.shape.len() != 1 {
        return None;
    }
    let outer = desc.dtype.compound_fields()?;
    let root_index = outer
        .iter()
        .position(|f| f.name == config.packed_root_field)?;
    let modules = outer[root_index].dtype.compound_fields()?;
    Some((root_index, modules.to_vec(), desc.shape[0]))
}

/// Shape a compound field takes when exposed as a leaf.
fn field_descriptor(dtype: &DataType) -> LeafDescriptor {
    match dtype {
        DataType::Array { elem, dims } => LeafDescriptor::new((**elem).clone(), dims.clone()),
        other => LeafDescriptor::new(other.clone(), vec![]),
    }
}

impl PackedView {
    /// Maps a path's first component to a packed element index.
    fn element_index(&self, path: &NodePath) -> Option<usize> {
        let first = path.components().first()?;
        let idx: usize = first.parse().ok()?;
        (idx < self.count && idx.to_string() == *first).then_some(idx)
    }

    fn field(&self, path: &NodePath) -> Result<(usize, &FieldDef), ViewerError> {
        let name = &path.components()[1];
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| &f.name == name)
            .ok_or_else(|| ViewerError::MissingNode(path.to_string()))
    }

    fn packed_data(&self) -> Result<Rc<LeafData>, ViewerError> {
        if let Some(data) = self.data.borrow().as_ref() {
            return Ok(Rc::clone(data));
        }
        let data = Rc::new(self.inner.read_leaf(&self.dataset)?);
        debug!(elements = data.values.len(), "packed dataset loaded");
        *self.data.borrow_mut() = Some(Rc::clone(&data));
        Ok(data)
    }

    fn read_field(&self, element: usize, field_index: usize, path: &NodePath) -> Result<Value, ViewerError> {
        let malformed = || ViewerError::Io(format!("packed element malformed at {}", path));
        let data = self.packed_data()?;
        let Some(Value::Compound(outer)) = data.values.get(element) else {
            return Err(malformed());
        };
        let Some(Value::Compound(modules)) = outer.get(self.root_index) else {
            return Err(malformed());
        };
        modules.get(field_index).cloned().ok_or_else(malformed)
    }
}

impl ContainerSource for PackedView {
    fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError> {
        if path.is_root() {
            let mut entries: Vec<ChildEntry> = (0..self.count)
                .map(|i| ChildEntry {
                    name: i.to_string(),
                    kind: NodeKind::Group,
                })
                .collect();
            let dataset_name = self.dataset.name();
            entries.extend(
                self.inner
                    .list_children(path)?
                    .into_iter()
                    .filter(|c| c.name != dataset_name),
            );
            return Ok(entries);
        }
        match (self.element_index(path), path.components().len()) {
            (Some(_), 1) => Ok(self
                .fields
                .iter()
                .map(|f| ChildEntry {
                    name: f.name.clone(),
                    kind: NodeKind::Dataset,
                })
                .collect()),
            (Some(_), 2) => {
                self.field(path)?;
                Err(ViewerError::NotAGroup(path.to_string()))
            }
            (Some(_), _) => Err(ViewerError::MissingNode(path.to_string())),
            (None, _) => self.inner.list_children(path),
        }
    }

    fn attributes(&self, path: &NodePath) -> Result<Vec<Attribute>, ViewerError> {
        match (self.element_index(path), path.components().len()) {
            (Some(_), 1) => Ok(Vec::new()),
            (Some(_), 2) => self.field(path).map(|_| Vec::new()),
            (Some(_), _) => Err(ViewerError::MissingNode(path.to_string())),
            (None, _) => self.inner.attributes(path),
        }
    }

    fn describe(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError> {
        match (self.element_index(path), path.components().len()) {
            (Some(_), 1) => Err(ViewerError::NotALeaf(path.to_string())),
            (Some(_), 2) => self.field(path).map(|(_, f)| field_descriptor(&f.dtype)),
            (Some(_), _) => Err(ViewerError::MissingNode(path.to_string())),
            (None, _) => self.inner.describe(path),
        }
    }

    fn read_leaf(&self, path: &NodePath) -> Result<LeafData, ViewerError> {
        match (self.element_index(path), path.components().len()) {
            (Some(_), 1) => Err(ViewerError::NotALeaf(path.to_string())),
            (Some(element), 2) => {
                let (field_index, field) = self.field(path)?;
                let descriptor = field_descriptor(&field.dtype);
                let value = self.read_field(element, field_index, path)?;
                let values = match (&field.dtype, value) {
                    (DataType::Array { .. }, Value::Array(items)) => items,
                    (_, value) => vec![value],
                };
                Ok(LeafData { descriptor, values })
            }
            (Some(_), _) => Err(ViewerError::MissingNode(path.to_string())),
            (None, _) => self.inner.read_leaf(path),
        }
    }

    fn format_name(&self) -> &'static str {
        match self.inner.format_name() {
            "native" => "native/packed",
            "json" => "json/packed",
            _ => "packed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tree::{MemorySource, Node};

    /// Simulator-style file: `stats[2]` of `{root: {phase, time[4], core[2]{instrs}}}`.
    fn packed_tree() -> Node {
        let core_t = DataType::compound(vec![FieldDef::new("instrs", DataType::u64())]);
        let root_t = DataType::compound(vec![
            FieldDef::new("phase", DataType::i64()),
            FieldDef::new("time", DataType::array(DataType::u64(), 4)),
            FieldDef::new("core", DataType::array(core_t, 2)),
        ]);
        let stats_t = DataType::compound(vec![FieldDef::new("root", root_t)]);
        let element = |phase: i64, base: u64| {
            Value::Compound(vec![Value::Compound(vec![
                Value::Int(phase),
                Value::Array((0..4).map(|t| Value::UInt(base + t)).collect()),
                Value::Array(vec![
                    Value::Compound(vec![Value::UInt(base)]),
                    Value::Compound(vec![Value::UInt(base + 1)]),
                ]),
            ])])
        };
        Node::group("/").with_child(Node::dataset(
            "stats",
            stats_t,
            vec![2],
            vec![element(5, 100), element(2, 200)],
        ))
    }

    fn view() -> Box<dyn ContainerSource> {
        wrap_if_packed(
            Box::new(MemorySource::new(packed_tree())),
            &ViewerConfig::default(),
        )
    }

    #[test]
    fn test_packed_exposes_virtual_groups() {
        let v = view();
        assert_eq!(v.format_name(), "packed");
        let root = v.list_children(&NodePath::root()).unwrap();
        let names: Vec<_> = root.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1"]);
        assert!(root.iter().all(|c| c.kind == NodeKind::Group));

        let modules = v.list_children(&NodePath::parse("/1")).unwrap();
        let names: Vec<_> = modules.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["phase", "time", "core"]);
    }

    #[test]
    fn test_packed_field_shapes_and_values() {
        let v = view();
        let core = v.describe(&NodePath::parse("/0/core")).unwrap();
        assert_eq!(core.shape, vec![2]);
        assert!(core.dtype.compound_fields().is_some());

        let time = v.read_leaf(&NodePath::parse("/1/time")).unwrap();
        assert_eq!(time.descriptor.shape, vec![4]);
        assert_eq!(time.values.last(), Some(&Value::UInt(203)));

        let phase = v.read_leaf(&NodePath::parse("/0/phase")).unwrap();
        assert_eq!(phase.values, vec![Value::Int(5)]);
    }

    #[test]
    fn test_packed_unknown_paths() {
        let v = view();
        assert!(matches!(
            v.describe(&NodePath::parse("/0/nope")),
            Err(ViewerError::MissingNode(_))
        ));
        assert!(matches!(
            v.list_children(&NodePath::parse("/7")),
            Err(ViewerError::MissingNode(_))
        ));
        assert!(matches!(
            v.read_leaf(&NodePath::parse("/0")),
            Err(ViewerError::NotALeaf(_))
        ));
    }

    #[test]
    fn test_plain_tree_not_wrapped() {
        let src = wrap_if_packed(
            Box::new(MemorySource::new(Node::group("/").with_child(Node::group("snap")))),
            &ViewerConfig::default(),
        );
        assert_eq!(src.format_name(), "memory");
    }
}
