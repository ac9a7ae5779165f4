//! Self-describing type, shape and value model of container leaves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Absolute path of a node inside a container (`/snap0/core`).
///
/// Top-level names may repeat, so a path built from an enumerated snapshot
/// also carries the position of its first component among the root's
/// children. Sources resolve that position instead of the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    parts: Vec<String>,
    top: Option<usize>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a slash-separated path; empty components are ignored. The
    /// first component is resolved by name.
    pub fn parse(path: &str) -> Self {
        Self {
            parts: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            top: None,
        }
    }

    /// Path of the root's child at `position`, named `name`.
    pub fn top_level(position: usize, name: &str) -> Self {
        Self {
            parts: vec![name.to_string()],
            top: Some(position),
        }
    }

    pub fn child(&self, name: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(name.to_string());
        Self {
            parts,
            top: self.top,
        }
    }

    pub fn components(&self) -> &[String] {
        &self.parts
    }

    /// Position of the first component among the root's children, when known.
    pub fn top_position(&self) -> Option<usize> {
        self.top
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Last component, or `/` for the root.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("/")
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return write!(f, "/");
        }
        for part in &self.parts {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

/// Kind of a node in the container tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Dataset,
}

/// One entry returned by `list_children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub name: String,
    pub kind: NodeKind,
}

/// Declared element type of a dataset or compound field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int { signed: bool, bytes: u8 },
    Float { bytes: u8 },
    Str,
    /// Structured type; `name` is informational only and never compared.
    Compound {
        name: Option<String>,
        fields: Vec<FieldDef>,
    },
    /// Fixed-size sub-array, used as a field type (e.g. `time[4]`).
    Array { elem: Box<DataType>, dims: Vec<usize> },
}

/// One named member of a compound type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub dtype: DataType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

impl DataType {
    pub fn i64() -> Self {
        DataType::Int {
            signed: true,
            bytes: 8,
        }
    }

    pub fn u64() -> Self {
        DataType::Int {
            signed: false,
            bytes: 8,
        }
    }

    pub fn f64() -> Self {
        DataType::Float { bytes: 8 }
    }

    pub fn compound(fields: Vec<FieldDef>) -> Self {
        DataType::Compound { name: None, fields }
    }

    pub fn array(elem: DataType, len: usize) -> Self {
        DataType::Array {
            elem: Box::new(elem),
            dims: vec![len],
        }
    }

    /// True for single integer, float or string types.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            DataType::Int { .. } | DataType::Float { .. } | DataType::Str
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int { .. } | DataType::Float { .. })
    }

    /// Sub-fields of a structured type with at least one member.
    pub fn compound_fields(&self) -> Option<&[FieldDef]> {
        match self {
            DataType::Compound { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    /// Number of scalar values one element of this type occupies.
    pub fn element_count(&self) -> usize {
        match self {
            DataType::Array { dims, .. } => dims.iter().product(),
            _ => 1,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int { signed, bytes } => {
                write!(f, "{}{}", if *signed { "i" } else { "u" }, *bytes as u32 * 8)
            }
            DataType::Float { bytes } => write!(f, "f{}", *bytes as u32 * 8),
            DataType::Str => write!(f, "str"),
            DataType::Compound { name: Some(n), .. } => write!(f, "{}", n),
            DataType::Compound { name: None, fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.dtype)?;
                }
                write!(f, "}}")
            }
            DataType::Array { elem, dims } => {
                write!(f, "{}", elem)?;
                for d in dims {
                    write!(f, "[{}]", d)?;
                }
                Ok(())
            }
        }
    }
}

/// A decoded value. Sub-arrays are stored flat in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Compound(Vec<Value>),
    Array(Vec<Value>),
}

impl Value {
    /// Numeric view used by snapshot previews and SUM rows.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Best-effort type of a scalar or sub-array value; `None` for compounds.
    pub fn infer_type(&self) -> Option<DataType> {
        match self {
            Value::Int(_) => Some(DataType::i64()),
            Value::UInt(_) => Some(DataType::u64()),
            Value::Float(_) => Some(DataType::f64()),
            Value::Str(_) => Some(DataType::Str),
            Value::Array(items) => {
                let elem = items
                    .first()
                    .and_then(Value::infer_type)
                    .unwrap_or_else(DataType::i64);
                Some(DataType::array(elem, items.len()))
            }
            Value::Compound(_) => None,
        }
    }
}

/// Type and shape of a dataset, readable without touching its values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeafDescriptor {
    pub dtype: DataType,
    pub shape: Vec<usize>,
}

impl LeafDescriptor {
    pub fn new(dtype: DataType, shape: Vec<usize>) -> Self {
        Self { dtype, shape }
    }

    /// Number of elements implied by the shape (1 for 0-d).
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dataset's descriptor plus its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafData {
    pub descriptor: LeafDescriptor,
    pub values: Vec<Value>,
}
