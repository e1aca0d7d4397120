//! Numeric column coercion.
//!
//! Warehouse results carry DECIMAL and BIGINT values as JSON strings. A column
//! that is numeric in nature is converted to numeric cells; cells that fail to
//! parse become null. A column where nothing parses is left untouched.

use crate::table::{Column, TabularResult, Value};

/// Coerce numeric-looking columns of `result` to numeric values.
///
/// Idempotent: columns already numeric are skipped, and columns left as text
/// fail the same way on a second pass.
pub fn normalize(result: TabularResult) -> TabularResult {
    let columns = result
        .into_columns()
        .into_iter()
        .map(normalize_column)
        .collect();

    // Column lengths are unchanged, so the shape invariant still holds.
    TabularResult::new(columns).unwrap_or_default()
}

/// Coerce a single column, or return it unchanged.
pub fn normalize_column(column: Column) -> Column {
    if column.is_numeric() || column.values.iter().all(Value::is_null) {
        return column;
    }

    let parsed: Vec<Option<Value>> = column.values.iter().map(parse_cell).collect();
    let converted = parsed.iter().filter(|v| v.is_some()).count();
    if converted == 0 {
        return column;
    }

    let failed = column
        .values
        .iter()
        .zip(&parsed)
        .filter(|(orig, p)| p.is_none() && !orig.is_null())
        .count();
    if failed > 0 {
        tracing::debug!(
            column = %column.name,
            converted,
            failed,
            "numeric column with unparseable cells, nulling them"
        );
    }

    Column {
        name: column.name,
        type_name: column.type_name,
        values: parsed
            .into_iter()
            .map(|v| v.unwrap_or(Value::Null))
            .collect(),
    }
}

fn parse_cell(value: &Value) -> Option<Value> {
    match value {
        Value::Int(_) | Value::Float(_) => Some(value.clone()),
        Value::Text(s) => parse_number(s),
        Value::Null | Value::Bool(_) | Value::Date(_) | Value::Timestamp(_) => None,
    }
}

/// Parse text as an integer, falling back to a finite float.
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(Value::Float(f)),
        _ => None,
    }
}
