//! In-memory node tree: the decoded form of every on-disk variant and the
//! builder used by tests and the demo writer.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

use super::ContainerSource;
use super::types::{
    ChildEntry, DataType, FieldDef, LeafData, LeafDescriptor, NodeKind, NodePath, Value,
};

/// Named value attached to a group or dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

/// A group or dataset with its children / values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Group {
        name: String,
        attrs: Vec<Attribute>,
        children: Vec<Node>,
    },
    Dataset {
        name: String,
        attrs: Vec<Attribute>,
        dtype: DataType,
        shape: Vec<usize>,
        values: Vec<Value>,
    },
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Node::Group {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn dataset(
        name: impl Into<String>,
        dtype: DataType,
        shape: Vec<usize>,
        values: Vec<Value>,
    ) -> Self {
        Node::Dataset {
            name: name.into(),
            attrs: Vec::new(),
            dtype,
            shape,
            values,
        }
    }

    /// 0-d dataset whose type is inferred from the value. A `Value::Array`
    /// becomes a 1-d dataset of its elements.
    pub fn scalar(name: impl Into<String>, value: Value) -> Self {
        match value {
            Value::Array(items) => {
                let elem = items
                    .first()
                    .and_then(Value::infer_type)
                    .unwrap_or_else(DataType::i64);
                let len = items.len();
                Node::dataset(name, elem, vec![len], items)
            }
            other => {
                let dtype = other.infer_type().unwrap_or(DataType::Str);
                Node::dataset(name, dtype, vec![], vec![other])
            }
        }
    }

    /// 0-d compound dataset; field types are inferred from the values.
    pub fn compound(name: impl Into<String>, fields: &[(&str, Value)]) -> Self {
        let defs = fields
            .iter()
            .map(|(n, v)| FieldDef::new(*n, v.infer_type().unwrap_or(DataType::Str)))
            .collect();
        let values = fields.iter().map(|(_, v)| v.clone()).collect();
        Node::dataset(
            name,
            DataType::compound(defs),
            vec![],
            vec![Value::Compound(values)],
        )
    }

    /// 1-d array of compound rows sharing one field schema.
    pub fn compound_array(
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let len = rows.len();
        Node::dataset(
            name,
            DataType::compound(fields),
            vec![len],
            rows.into_iter().map(Value::Compound).collect(),
        )
    }

    pub fn with_child(mut self, child: Node) -> Self {
        if let Node::Group { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        let attr = Attribute {
            name: name.into(),
            value,
        };
        match &mut self {
            Node::Group { attrs, .. } | Node::Dataset { attrs, .. } => attrs.push(attr),
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Group { name, .. } | Node::Dataset { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Group { .. } => NodeKind::Group,
            Node::Dataset { .. } => NodeKind::Dataset,
        }
    }

    pub fn attrs(&self) -> &[Attribute] {
        match self {
            Node::Group { attrs, .. } | Node::Dataset { attrs, .. } => attrs,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group { children, .. } => children,
            Node::Dataset { .. } => &[],
        }
    }

    /// Finds a descendant by relative path components. Names are unique per
    /// scope; the first match wins if a producer violated that.
    pub fn find(&self, components: &[String]) -> Option<&Node> {
        let mut node = self;
        for part in components {
            node = node.children().iter().find(|c| c.name() == part)?;
        }
        Some(node)
    }

    /// Resolves an absolute path from this root. A known top-level position
    /// picks the child by index, so repeated top-level names stay distinct.
    pub fn resolve(&self, path: &NodePath) -> Option<&Node> {
        match (path.top_position(), path.components().split_first()) {
            (Some(position), Some((first, rest))) => {
                let top = self.children().get(position)?;
                if top.name() != first.as_str() {
                    return None;
                }
                top.find(rest)
            }
            _ => self.find(path.components()),
        }
    }

    pub fn child_entries(&self) -> Vec<ChildEntry> {
        self.children()
            .iter()
            .map(|c| ChildEntry {
                name: c.name().to_string(),
                kind: c.kind(),
            })
            .collect()
    }

    pub fn descriptor(&self) -> Option<LeafDescriptor> {
        match self {
            Node::Dataset { dtype, shape, .. } => {
                Some(LeafDescriptor::new(dtype.clone(), shape.clone()))
            }
            Node::Group { .. } => None,
        }
    }

    /// Group-level operations on a resolved node, shared by the tree-backed sources.
    pub(crate) fn group_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError> {
        match self {
            Node::Group { .. } => Ok(self.child_entries()),
            Node::Dataset { .. } => Err(ViewerError::NotAGroup(path.to_string())),
        }
    }

    pub(crate) fn leaf_descriptor(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError> {
        self.descriptor()
            .ok_or_else(|| ViewerError::NotALeaf(path.to_string()))
    }

    pub(crate) fn leaf_data(&self, path: &NodePath) -> Result<LeafData, ViewerError> {
        match self {
            Node::Dataset {
                dtype,
                shape,
                values,
                ..
            } => Ok(LeafData {
                descriptor: LeafDescriptor::new(dtype.clone(), shape.clone()),
                values: values.clone(),
            }),
            Node::Group { .. } => Err(ViewerError::NotALeaf(path.to_string())),
        }
    }
}

/// Container source backed by a fully decoded tree.
#[derive(Debug, Clone)]
pub struct MemorySource {
    root: Node,
    format: &'static str,
}

impl MemorySource {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            format: "memory",
        }
    }

    pub(crate) fn with_format(root: Node, format: &'static str) -> Self {
        Self { root, format }
    }

    fn resolve(&self, path: &NodePath) -> Result<&Node, ViewerError> {
        self.root
            .resolve(path)
            .ok_or_else(|| ViewerError::MissingNode(path.to_string()))
    }
}

impl ContainerSource for MemorySource {
    fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError> {
        self.resolve(path)?.group_children(path)
    }

    fn attributes(&self, path: &NodePath) -> Result<Vec<Attribute>, ViewerError> {
        Ok(self.resolve(path)?.attrs().to_vec())
    }

    fn describe(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError> {
        self.resolve(path)?.leaf_descriptor(path)
    }

    fn read_leaf(&self, path: &NodePath) -> Result<LeafData, ViewerError> {
        self.resolve(path)?.leaf_data(path)
    }

    fn format_name(&self) -> &'static str {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Node {
        Node::group("/").with_child(
            Node::group("snap0")
                .with_attr("phase", Value::Int(3))
                .with_child(Node::compound(
                    "mem",
                    &[("reads", Value::UInt(5)), ("lat", Value::Float(1.5))],
                ))
                .with_child(Node::scalar(
                    "time",
                    Value::Array(vec![Value::Int(1), Value::Int(9)]),
                )),
        )
    }

    #[test]
    fn test_memory_source_listing_keeps_declaration_order() {
        let src = MemorySource::new(tree());
        let children = src.list_children(&NodePath::parse("/snap0")).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["mem", "time"]);
        assert!(children.iter().all(|c| c.kind == NodeKind::Dataset));
    }

    #[test]
    fn test_memory_source_errors() {
        let src = MemorySource::new(tree());
        assert!(matches!(
            src.describe(&NodePath::parse("/snap0")),
            Err(ViewerError::NotALeaf(_))
        ));
        assert!(matches!(
            src.list_children(&NodePath::parse("/snap0/mem")),
            Err(ViewerError::NotAGroup(_))
        ));
        assert!(matches!(
            src.read_leaf(&NodePath::parse("/nope")),
            Err(ViewerError::MissingNode(_))
        ));
    }

    #[test]
    fn test_builders_infer_types() {
        let src = MemorySource::new(tree());
        let mem = src.describe(&NodePath::parse("/snap0/mem")).unwrap();
        assert_eq!(mem.shape, Vec::<usize>::new());
        assert_eq!(mem.dtype.to_string(), "{reads: u64, lat: f64}");

        let time = src.read_leaf(&NodePath::parse("/snap0/time")).unwrap();
        assert_eq!(time.descriptor.shape, vec![2]);
        assert_eq!(time.values, vec![Value::Int(1), Value::Int(9)]);

        let attrs = src.attributes(&NodePath::parse("/snap0")).unwrap();
        assert_eq!(attrs[0].name, "phase");
    }

    #[test]
    fn test_compound_array_zero_rows() {
        let node = Node::compound_array("core", vec![FieldDef::new("instrs", DataType::u64())], vec![]);
        let desc = node.descriptor().unwrap();
        assert_eq!(desc.shape, vec![0]);
    }
}
