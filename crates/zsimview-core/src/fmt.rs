//! Shared formatting helpers for grid cells, previews and raw values.
//!
//! All functions are pure (no UI types): the materializer, the dump tool and
//! the TUI share them.

use crate::container::{LeafData, Value};

/// Float with a fixed number of digits after the decimal point.
pub fn format_float(v: f64, precision: usize) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:.*}", precision, v)
    }
}

/// Integral values without a fractional part, others as [`format_float`].
///
/// Used for snapshot previews where the producer's time unit is usually an
/// integer cycle count stored in a float.
pub fn format_number(v: f64, precision: usize) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format_float(v, precision)
    }
}

/// Formats one cell value. Integers never get fractional digits, strings
/// pass through verbatim, sub-arrays render as `[a, b, c]` and nested
/// compounds as `(a, b)`.
pub fn format_value(value: &Value, precision: usize) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => format_float(*v, precision),
        Value::Str(s) => s.clone(),
        Value::Array(items) => format!("[{}]", join(items, precision)),
        Value::Compound(items) => format!("({})", join(items, precision)),
    }
}

fn join(items: &[Value], precision: usize) -> String {
    items
        .iter()
        .map(|v| format_value(v, precision))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stringifies a whole leaf following its shape: `7` for 0-d, `[1, 2]` for
/// 1-d, `[[1, 2], [3, 4]]` for 2-d and so on.
pub fn format_raw(leaf: &LeafData, precision: usize) -> String {
    let shape = &leaf.descriptor.shape;
    if shape.is_empty() {
        return leaf
            .values
            .first()
            .map(|v| format_value(v, precision))
            .unwrap_or_default();
    }
    let mut out = String::new();
    nest(&leaf.values, shape, precision, &mut out);
    out
}

fn nest(values: &[Value], shape: &[usize], precision: usize, out: &mut String) {
    out.push('[');
    match shape.split_first() {
        Some((&n, [])) => {
            for (i, v) in values.iter().take(n).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format_value(v, precision));
            }
        }
        Some((&n, rest)) => {
            let stride: usize = rest.iter().product();
            for i in 0..n {
                if i > 0 {
                    out.push_str(", ");
                }
                let start = (i * stride).min(values.len());
                let end = (start + stride).min(values.len());
                nest(&values[start..end], rest, precision, out);
            }
        }
        None => {}
    }
    out.push(']');
}

/// Truncates to `max` characters, marking the cut with `~`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('~');
    out
}
