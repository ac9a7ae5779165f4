//! Record classifier: turns a leaf's shape and type into a record shape.
//!
//! Classification is a pure function of [`LeafDescriptor`]; leaf names and
//! positions never influence it.

use std::collections::BTreeSet;

use xxhash_rust::xxh3::xxh3_64;

use crate::container::{DataType, FieldDef, LeafDescriptor};

/// Ordered field set of a compound record. Declaration order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Same set of field names, ignoring order and types.
    pub fn same_names(&self, other: &FieldSchema) -> bool {
        let a: BTreeSet<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        let b: BTreeSet<&str> = other.fields.iter().map(|f| f.name.as_str()).collect();
        a == b
    }

    /// Same names and types in the same order. Compound type names are not
    /// compared: each snapshot self-describes its own types.
    pub fn structurally_equal(&self, other: &FieldSchema) -> bool {
        self.fingerprint() == other.fingerprint()
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && structural_type_eq(&a.dtype, &b.dtype))
    }

    /// Hash over field names and structural types.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = String::new();
        for field in &self.fields {
            buf.push_str(&field.name);
            buf.push(':');
            push_structural(&field.dtype, &mut buf);
            buf.push(';');
        }
        xxh3_64(buf.as_bytes())
    }
}

fn structural_type_eq(a: &DataType, b: &DataType) -> bool {
    match (a, b) {
        (DataType::Compound { fields: fa, .. }, DataType::Compound { fields: fb, .. }) => {
            fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb)
                    .all(|(x, y)| x.name == y.name && structural_type_eq(&x.dtype, &y.dtype))
        }
        (
            DataType::Array {
                elem: ea,
                dims: da,
            },
            DataType::Array {
                elem: eb,
                dims: db,
            },
        ) => da == db && structural_type_eq(ea, eb),
        _ => a == b,
    }
}

fn push_structural(dtype: &DataType, buf: &mut String) {
    match dtype {
        DataType::Compound { fields, .. } => {
            buf.push('{');
            for f in fields {
                buf.push_str(&f.name);
                buf.push(':');
                push_structural(&f.dtype, buf);
                buf.push(',');
            }
            buf.push('}');
        }
        DataType::Array { elem, dims } => {
            push_structural(elem, buf);
            for d in dims {
                buf.push_str(&format!("[{}]", d));
            }
        }
        other => buf.push_str(&other.to_string()),
    }
}

/// Classified shape of one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Record {
    Scalar { dtype: DataType },
    Compound { fields: FieldSchema },
    ArrayOfCompound { fields: FieldSchema, len: usize },
    /// Listed by name and rendered as a stringified raw value. The
    /// descriptor is `None` when the leaf could not even be described.
    Unsupported {
        descriptor: Option<LeafDescriptor>,
        reason: String,
    },
}

impl Record {
    pub fn fields(&self) -> Option<&FieldSchema> {
        match self {
            Record::Compound { fields } | Record::ArrayOfCompound { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Record::Unsupported { .. })
    }

    /// Short description for lists: `scalar`, `compound`, `array[L]`, `raw`.
    pub fn kind_label(&self) -> String {
        match self {
            Record::Scalar { .. } => "scalar".to_string(),
            Record::Compound { .. } => "compound".to_string(),
            Record::ArrayOfCompound { len, .. } => format!("array[{}]", len),
            Record::Unsupported { .. } => "raw".to_string(),
        }
    }

    /// Whether a selection made against `self` may be retargeted to `other`:
    /// same variant and, for compound shapes, the same field-name set. Row
    /// counts may differ.
    pub fn compatible_with(&self, other: &Record) -> bool {
        match (self, other) {
            (Record::Scalar { .. }, Record::Scalar { .. }) => true,
            (Record::Compound { fields: a }, Record::Compound { fields: b }) => a.same_names(b),
            (
                Record::ArrayOfCompound { fields: a, .. },
                Record::ArrayOfCompound { fields: b, .. },
            ) => a.same_names(b),
            (Record::Unsupported { .. }, Record::Unsupported { .. }) => true,
            _ => false,
        }
    }
}

/// Classifies a leaf by its shape and type.
pub fn classify(desc: &LeafDescriptor) -> Record {
    let dims = desc.shape.len();
    match (dims, desc.dtype.compound_fields()) {
        (0, None) if desc.dtype.is_scalar() => Record::Scalar {
            dtype: desc.dtype.clone(),
        },
        (0, Some(fields)) => Record::Compound {
            fields: FieldSchema::new(fields.to_vec()),
        },
        (1, Some(fields)) => Record::ArrayOfCompound {
            fields: FieldSchema::new(fields.to_vec()),
            len: desc.shape[0],
        },
        _ => Record::Unsupported {
            descriptor: Some(desc.clone()),
            reason: unsupported_reason(dims, &desc.dtype),
        },
    }
}

fn unsupported_reason(dims: usize, dtype: &DataType) -> String {
    match (dims, dtype) {
        (_, DataType::Compound { fields, .. }) if fields.is_empty() => {
            "compound type without fields".to_string()
        }
        (0, _) => format!("0-dimensional {} value", dtype),
        (1, _) => format!("1-dimensional array of {}", dtype),
        (n, _) => format!("{}-dimensional dataset of {}", n, dtype),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_type() -> DataType {
        DataType::compound(vec![
            FieldDef::new("instrs", DataType::u64()),
            FieldDef::new("cycles", DataType::u64()),
        ])
    }

    #[test]
    fn test_scalar() {
        let r = classify(&LeafDescriptor::new(DataType::f64(), vec![]));
        assert_eq!(r, Record::Scalar { dtype: DataType::f64() });
        assert_eq!(r.kind_label(), "scalar");
        let r = classify(&LeafDescriptor::new(DataType::Str, vec![]));
        assert!(matches!(r, Record::Scalar { .. }));
    }

    #[test]
    fn test_compound_preserves_field_order() {
        let r = classify(&LeafDescriptor::new(core_type(), vec![]));
        let fields = r.fields().unwrap();
        assert_eq!(fields.names(), vec!["instrs", "cycles"]);
        assert!(matches!(r, Record::Compound { .. }));
    }

    #[test]
    fn test_array_of_compound_including_empty() {
        let r = classify(&LeafDescriptor::new(core_type(), vec![4]));
        assert!(matches!(r, Record::ArrayOfCompound { len: 4, .. }));
        assert_eq!(r.kind_label(), "array[4]");

        let r = classify(&LeafDescriptor::new(core_type(), vec![0]));
        assert!(matches!(r, Record::ArrayOfCompound { len: 0, .. }));
    }

    #[test]
    fn test_unsupported_shapes() {
        let plain_1d = classify(&LeafDescriptor::new(DataType::u64(), vec![8]));
        assert!(plain_1d.is_unsupported());

        let two_d = classify(&LeafDescriptor::new(core_type(), vec![2, 2]));
        match two_d {
            Record::Unsupported { reason, .. } => assert!(reason.starts_with("2-dimensional")),
            other => panic!("expected unsupported, got {:?}", other),
        }

        let empty_compound = classify(&LeafDescriptor::new(DataType::compound(vec![]), vec![]));
        assert!(empty_compound.is_unsupported());

        let sub_array = classify(&LeafDescriptor::new(DataType::array(DataType::i64(), 4), vec![]));
        assert!(sub_array.is_unsupported());
    }

    #[test]
    fn test_classification_is_pure() {
        let desc = LeafDescriptor::new(core_type(), vec![3]);
        assert_eq!(classify(&desc), classify(&desc.clone()));
    }

    #[test]
    fn test_structural_comparison_ignores_type_names() {
        let named = DataType::Compound {
            name: Some("CoreStats".into()),
            fields: core_type().compound_fields().unwrap().to_vec(),
        };
        let a = FieldSchema::new(named.compound_fields().unwrap().to_vec());
        let b = FieldSchema::new(core_type().compound_fields().unwrap().to_vec());
        assert!(a.structurally_equal(&b));
        assert_eq!(a.fingerprint(), b.fingerprint());

        let reordered = FieldSchema::new(vec![
            FieldDef::new("cycles", DataType::u64()),
            FieldDef::new("instrs", DataType::u64()),
        ]);
        assert!(!a.structurally_equal(&reordered));
        assert!(a.same_names(&reordered));

        let retyped = FieldSchema::new(vec![
            FieldDef::new("instrs", DataType::f64()),
            FieldDef::new("cycles", DataType::u64()),
        ]);
        assert!(!a.structurally_equal(&retyped));
        assert!(a.same_names(&retyped));
    }

    #[test]
    fn test_compatibility() {
        let four = classify(&LeafDescriptor::new(core_type(), vec![4]));
        let eight = classify(&LeafDescriptor::new(core_type(), vec![8]));
        assert!(four.compatible_with(&eight));

        let single = classify(&LeafDescriptor::new(core_type(), vec![]));
        assert!(!four.compatible_with(&single));

        let other_fields = classify(&LeafDescriptor::new(
            DataType::compound(vec![FieldDef::new("hits", DataType::u64())]),
            vec![4],
        ));
        assert!(!four.compatible_with(&other_fields));

        let int = classify(&LeafDescriptor::new(DataType::i64(), vec![]));
        let float = classify(&LeafDescriptor::new(DataType::f64(), vec![]));
        assert!(int.compatible_with(&float));
    }
}
