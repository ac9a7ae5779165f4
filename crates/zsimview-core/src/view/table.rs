//! Table materializer: selection + snapshot -> [`Grid`].

use tracing::{debug, warn};

use crate::classify::{FieldSchema, Record};
use crate::config::ViewerConfig;
use crate::container::{Container, LeafData, Value};
use crate::fmt::{format_raw, format_value};
use crate::selection::{SelectionState, Target};

use super::{Grid, GridRow, GridStatus, RowStyleClass};

const SUM_LABEL: &str = "SUM";

/// Builds the grid for the current selection.
///
/// Unselected and stale selections yield [`Grid::empty`]. Array records longer
/// than `config.eager_row_limit` are left [`GridStatus::Deferred`] unless
/// `force` is set. Read failures produce [`GridStatus::Failed`], never an `Err`.
pub fn materialize(
    container: &Container,
    state: &SelectionState,
    config: &ViewerConfig,
    force: bool,
) -> Grid {
    let (selection, target) = match state {
        SelectionState::Unselected => return Grid::empty("select a module"),
        SelectionState::Stale {
            selection, reason, ..
        } => return Grid::empty(format!("{} unavailable: {}", selection, reason)),
        SelectionState::Selected { selection, target } => (selection, target),
    };

    let title = format!(
        "{}:{} @ snapshot {}",
        selection.module, target.record_name, target.snapshot
    );

    if let Record::ArrayOfCompound { fields, len } = &target.record {
        if *len > config.eager_row_limit && !force {
            debug!(path = %target.path, rows = len, "deferring large record");
            return Grid::with_status(title, headers(fields), GridStatus::Deferred { rows: *len });
        }
    }

    let leaf = match container.read_leaf(&target.path) {
        Ok(leaf) => leaf,
        Err(e) => {
            warn!(path = %target.path, error = %e, "record read failed");
            let headers = target.record.fields().map(headers).unwrap_or_default();
            return Grid::with_status(title, headers, GridStatus::Failed(e.to_string()));
        }
    };

    match build(target, &leaf, config) {
        Ok((headers, rows)) => {
            debug!(path = %target.path, rows = rows.len(), "materialized");
            Grid::ready(title, headers, rows)
        }
        Err(reason) => {
            warn!(path = %target.path, reason = %reason, "record does not match its descriptor");
            Grid::with_status(title, Vec::new(), GridStatus::Failed(reason))
        }
    }
}

fn headers(fields: &FieldSchema) -> Vec<String> {
    fields.names().into_iter().map(String::from).collect()
}

fn build(
    target: &Target,
    leaf: &LeafData,
    config: &ViewerConfig,
) -> Result<(Vec<String>, Vec<GridRow>), String> {
    let precision = config.precision;
    if leaf.values.len() != leaf.descriptor.len() {
        return Err(format!(
            "shape {:?} declares {} values, leaf holds {}",
            leaf.descriptor.shape,
            leaf.descriptor.len(),
            leaf.values.len()
        ));
    }
    match &target.record {
        Record::Scalar { .. } => {
            let value = leaf
                .values
                .first()
                .ok_or_else(|| "scalar without a value".to_string())?;
            let header = short_name(&target.record_name).to_string();
            Ok((
                vec![header],
                vec![row("0", vec![format_value(value, precision)], RowStyleClass::Normal)],
            ))
        }
        Record::Compound { fields } => {
            let cells = compound_cells(leaf.values.first(), fields, precision)?;
            Ok((headers(fields), vec![row("0", cells, RowStyleClass::Normal)]))
        }
        Record::ArrayOfCompound { fields, len } => {
            if leaf.values.len() != *len {
                return Err(format!(
                    "record declares {} rows, leaf holds {}",
                    len,
                    leaf.values.len()
                ));
            }
            let name = short_name(&target.record_name);
            let mut rows = Vec::with_capacity(leaf.values.len() + 1);
            if config.sum_row && !leaf.values.is_empty() {
                rows.push(row(
                    SUM_LABEL,
                    sum_cells(&leaf.values, fields.len(), precision),
                    RowStyleClass::Total,
                ));
            }
            for (i, value) in leaf.values.iter().enumerate() {
                let cells = compound_cells(Some(value), fields, precision)?;
                rows.push(row(&format!("{} {}", name, i), cells, RowStyleClass::Normal));
            }
            Ok((headers(fields), rows))
        }
        Record::Unsupported { .. } => Ok((
            vec!["raw".to_string()],
            vec![row("0", vec![format_raw(leaf, precision)], RowStyleClass::Raw)],
        )),
    }
}

fn row(label: &str, cells: Vec<String>, style: RowStyleClass) -> GridRow {
    GridRow {
        label: label.to_string(),
        cells,
        style,
    }
}

/// Last path segment of a flattened record name (`mshr/full` -> `full`).
fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn compound_cells(
    value: Option<&Value>,
    fields: &FieldSchema,
    precision: usize,
) -> Result<Vec<String>, String> {
    match value {
        Some(Value::Compound(items)) if items.len() == fields.len() => {
            Ok(items.iter().map(|v| format_value(v, precision)).collect())
        }
        Some(Value::Compound(items)) => Err(format!(
            "compound value has {} fields, type declares {}",
            items.len(),
            fields.len()
        )),
        _ => Err("expected a compound value".to_string()),
    }
}

/// Column totals; non-numeric columns are left blank.
fn sum_cells(rows: &[Value], columns: usize, precision: usize) -> Vec<String> {
    (0..columns)
        .map(|col| {
            let column: Vec<&Value> = rows
                .iter()
                .filter_map(|r| match r {
                    Value::Compound(items) => items.get(col),
                    _ => None,
                })
                .collect();
            sum_values(&column)
                .map(|v| format_value(&v, precision))
                .unwrap_or_default()
        })
        .collect()
}

fn sum_values(values: &[&Value]) -> Option<Value> {
    let first = values.first()?;
    match first {
        Value::Array(head) => {
            let mut elements = Vec::with_capacity(head.len());
            for i in 0..head.len() {
                let column = values
                    .iter()
                    .map(|v| match v {
                        Value::Array(items) => items.get(i),
                        _ => None,
                    })
                    .collect::<Option<Vec<&Value>>>()?;
                elements.push(sum_values(&column)?);
            }
            Some(Value::Array(elements))
        }
        _ if values.iter().all(|v| matches!(v, Value::Int(_) | Value::UInt(_))) => {
            let total: i128 = values
                .iter()
                .map(|v| match v {
                    Value::Int(x) => *x as i128,
                    Value::UInt(x) => *x as i128,
                    _ => 0,
                })
                .sum();
            Some(
                i64::try_from(total)
                    .map(Value::Int)
                    .or_else(|_| u64::try_from(total).map(Value::UInt))
                    .unwrap_or(Value::Float(total as f64)),
            )
        }
        _ => values
            .iter()
            .map(|v| v.as_f64())
            .sum::<Option<f64>>()
            .map(Value::Float),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DataType, FieldDef, Node};
    use crate::schema::normalize;
    use crate::selection::Selection;
    use crate::snapshot::enumerate;

    fn tree() -> Node {
        let core_fields = vec![
            FieldDef::new("instrs", DataType::u64()),
            FieldDef::new("ipc", DataType::f64()),
            FieldDef::new("lat", DataType::array(DataType::u64(), 2)),
            FieldDef::new("name", DataType::Str),
        ];
        let rows = (0..4u64)
            .map(|i| {
                vec![
                    Value::UInt(100 * (i + 1)),
                    Value::Float(0.5 * i as f64),
                    Value::Array(vec![Value::UInt(i), Value::UInt(10)]),
                    Value::Str(format!("c{}", i)),
                ]
            })
            .collect();
        Node::group("/").with_child(
            Node::group("s0")
                .with_child(Node::scalar("phase", Value::Int(3)))
                .with_child(Node::compound_array("core", core_fields.clone(), rows))
                .with_child(Node::compound_array("idle", core_fields, vec![]))
                .with_child(Node::compound(
                    "mem",
                    &[("reads", Value::UInt(7)), ("bw", Value::Float(1.0 / 3.0))],
                ))
                .with_child(Node::dataset(
                    "matrix",
                    DataType::i64(),
                    vec![2, 2],
                    (1..=4).map(Value::Int).collect(),
                )),
        )
    }

    fn grid_for(selection: Selection, config: &ViewerConfig, force: bool) -> Grid {
        let container = Container::from_tree("t.zsv", tree(), config);
        let snaps = enumerate(&container, config).unwrap();
        let (schema, _) = normalize(&container, &snaps[0]).unwrap();
        let state = SelectionState::Unselected.select(&schema, selection).unwrap();
        materialize(&container, &state, config, force)
    }

    #[test]
    fn test_scalar_grid() {
        let grid = grid_for(Selection::whole("phase"), &ViewerConfig::default(), false);
        assert_eq!(grid.headers, vec!["phase"]);
        assert_eq!(grid.row_labels(), vec!["0"]);
        assert_eq!(grid.rows[0].cells, vec!["3"]);
        assert_eq!(grid.title, "phase:phase @ snapshot 0");
    }

    #[test]
    fn test_compound_grid_uses_precision() {
        let config = ViewerConfig::default().with_precision(2);
        let grid = grid_for(Selection::whole("mem"), &config, false);
        assert_eq!(grid.headers, vec!["reads", "bw"]);
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0].cells, vec!["7", "0.33"]);
    }

    #[test]
    fn test_array_of_compound_rows() {
        let grid = grid_for(Selection::whole("core"), &ViewerConfig::default(), false);
        assert!(grid.is_ready());
        assert_eq!(grid.headers, vec!["instrs", "ipc", "lat", "name"]);
        assert_eq!(grid.row_labels(), vec!["core 0", "core 1", "core 2", "core 3"]);
        assert_eq!(grid.rows[2].cells, vec!["300", "1.000", "[2, 10]", "c2"]);
        assert_eq!(grid.line_count(), 5);
    }

    #[test]
    fn test_empty_array_renders_header_only() {
        let grid = grid_for(Selection::whole("idle"), &ViewerConfig::default(), false);
        assert!(grid.is_ready());
        assert_eq!(grid.headers.len(), 4);
        assert!(grid.rows.is_empty());
        assert_eq!(grid.line_count(), 1);
    }

    #[test]
    fn test_sum_row() {
        let config = ViewerConfig::default().with_sum_row(true);
        let grid = grid_for(Selection::whole("core"), &config, false);
        assert_eq!(grid.rows.len(), 5);
        assert_eq!(grid.data_rows().count(), 4);
        let sum = &grid.rows[0];
        assert_eq!(sum.label, "SUM");
        assert_eq!(sum.style, RowStyleClass::Total);
        assert_eq!(sum.cells, vec!["1000", "3.000", "[6, 40]", ""]);

        let idle = grid_for(Selection::whole("idle"), &config, false);
        assert!(idle.rows.is_empty());
    }

    #[test]
    fn test_raw_fallback() {
        let grid = grid_for(Selection::whole("matrix"), &ViewerConfig::default(), false);
        assert_eq!(grid.headers, vec!["raw"]);
        assert_eq!(grid.rows[0].cells, vec!["[[1, 2], [3, 4]]"]);
        assert_eq!(grid.rows[0].style, RowStyleClass::Raw);
    }

    #[test]
    fn test_deferred_until_forced() {
        let config = ViewerConfig::default().with_eager_row_limit(2);
        let grid = grid_for(Selection::whole("core"), &config, false);
        assert_eq!(grid.status, GridStatus::Deferred { rows: 4 });
        assert!(grid.rows.is_empty());
        assert_eq!(grid.headers.len(), 4);
        assert!(grid.message().unwrap().contains("4 rows"));

        let loaded = grid_for(Selection::whole("core"), &config, true);
        assert_eq!(loaded.rows.len(), 4);
    }

    #[test]
    fn test_short_array_fails_instead_of_dropping_rows() {
        let config = ViewerConfig::default();
        let fields = vec![FieldDef::new("instrs", DataType::u64())];
        let root = Node::group("/").with_child(Node::group("s0").with_child(Node::dataset(
            "core",
            DataType::compound(fields),
            vec![4],
            vec![
                Value::Compound(vec![Value::UInt(1)]),
                Value::Compound(vec![Value::UInt(2)]),
            ],
        )));
        let container = Container::from_tree("t.zsv", root, &config);
        let snaps = enumerate(&container, &config).unwrap();
        let (schema, _) = normalize(&container, &snaps[0]).unwrap();
        let state = SelectionState::Unselected
            .select(&schema, Selection::whole("core"))
            .unwrap();

        let grid = materialize(&container, &state, &config, false);
        assert!(!grid.is_ready());
        assert!(grid.rows.is_empty());
        match &grid.status {
            GridStatus::Failed(reason) => assert!(reason.contains("declares 4 values")),
            other => panic!("expected a failed grid, got {:?}", other),
        }
    }

    #[test]
    fn test_unselected_is_empty() {
        let config = ViewerConfig::default();
        let container = Container::from_tree("t.zsv", tree(), &config);
        let grid = materialize(&container, &SelectionState::Unselected, &config, false);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_sum_values_mixed_and_strings() {
        let a = Value::Int(-5);
        let b = Value::UInt(3);
        assert_eq!(sum_values(&[&a, &b]), Some(Value::Int(-2)));
        let f = Value::Float(0.5);
        assert_eq!(sum_values(&[&b, &f]), Some(Value::Float(3.5)));
        let s = Value::Str("x".into());
        assert_eq!(sum_values(&[&s]), None);
        assert_eq!(sum_values(&[]), None);
    }
}
