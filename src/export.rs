//! Result export and display formatting.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::table::{TabularResult, Value};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render as CSV: header row of column names, nulls as empty fields.
pub fn to_csv(result: &TabularResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(result.column_names())?;
    for row in result.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Render as a JSON array of row objects.
///
/// Repeated column names get a numeric suffix (`x`, `x_2`) so no cell is lost.
pub fn to_json(result: &TabularResult) -> Result<String, ExportError> {
    let names = unique_names(&result.column_names());
    let records: Vec<serde_json::Map<String, serde_json::Value>> = result
        .rows()
        .map(|row| {
            names
                .iter()
                .zip(row)
                .map(|(name, value)| Ok((name.to_string(), serde_json::to_value(value)?)))
                .collect::<Result<_, serde_json::Error>>()
        })
        .collect::<Result<_, _>>()?;
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Column names made distinct by suffixing repeats with `_2`, `_3`, ...
fn unique_names(names: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().map(|n| n.to_string()).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    names
        .iter()
        .map(|&name| {
            if seen.insert(name) {
                return name.to_string();
            }
            let mut n = 2;
            loop {
                let candidate = format!("{}_{}", name, n);
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Render as an aligned plain-text table.
pub fn to_text_table(result: &TabularResult) -> String {
    let names = result.column_names();
    let cells: Vec<Vec<String>> = result
        .rows()
        .map(|row| row.iter().map(|v| display_cell(v)).collect())
        .collect();

    let mut widths: Vec<usize> = names.iter().map(|n| n.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |out: &mut String, fields: &[&str]| {
        let padded: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(f, w)| format!("{:<width$}", f, width = *w))
            .collect();
        let _ = writeln!(out, "{}", padded.join("  ").trim_end());
    };

    line(&mut out, &names);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    line(&mut out, &rule.iter().map(String::as_str).collect::<Vec<_>>());
    for row in &cells {
        line(&mut out, &row.iter().map(String::as_str).collect::<Vec<_>>());
    }
    out
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Float(f) => format!("{:.2}", f),
        other => other.to_string(),
    }
}

/// Currency with K/M/B suffixes: `$2.82B`, `$1.5K`, `$12.00`.
pub fn format_currency(value: f64) -> String {
    match scaled(value) {
        Some(short) => format!("${}", short),
        None => format!("${:.2}", value),
    }
}

/// Count with K/M/B suffixes, or a comma-grouped integer below one thousand.
pub fn format_number(value: f64) -> String {
    match scaled(value) {
        Some(short) => short,
        None => group_thousands(value.round() as i64),
    }
}

fn scaled(value: f64) -> Option<String> {
    if value >= 1_000_000_000.0 {
        Some(format!("{:.2}B", value / 1_000_000_000.0))
    } else if value >= 1_000_000.0 {
        Some(format!("{:.2}M", value / 1_000_000.0))
    } else if value >= 1_000.0 {
        Some(format!("{:.1}K", value / 1_000.0))
    } else {
        None
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        grouped.insert(0, '-');
    }
    grouped
}
