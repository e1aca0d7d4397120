//! Backend clients for the Databricks workspace.
//!
//! Two access paths produce the same [`RawResult`] shape:
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │ WarehouseClient              │     │ SessionClient                │
//! │  POST /api/2.0/sql/statements│     │  POST /api/1.2/contexts/...  │
//! │  poll + fetch result chunks  │     │  execute + poll command      │
//! └──────────────┬───────────────┘     └──────────────┬───────────────┘
//!                │ column descriptors + JSON rows     │
//!                └────────────────┬───────────────────┘
//!                                 ▼
//!                     RawResult::into_table()
//! ```
//!
//! Both clients implement [`SqlClient`], the seam the resolver and executor
//! program against (and which tests replace with scripted clients).

mod auth;
mod error;
pub mod protocol;
mod session;
mod warehouse;

pub use auth::TokenProvider;
pub use error::{QueryError, QueryResult};
pub use session::SessionClient;
pub use warehouse::WarehouseClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;

use crate::config::ConnectionMode;
use crate::table::{Column, ShapeError, TabularResult, Value};

/// Longest error body kept in [`QueryError::Status`].
const MAX_ERROR_BODY: usize = 2048;

/// A client able to run SQL text against the engine.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Which access path this client uses.
    fn mode(&self) -> ConnectionMode;

    /// Run `sql` and materialize the complete result.
    async fn execute(&self, sql: &str) -> QueryResult<RawResult>;

    /// Release server-side resources held by the client.
    async fn close(&self) -> QueryResult<()> {
        Ok(())
    }
}

/// Column descriptor as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub type_name: Option<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.map(str::to_string),
        }
    }
}

/// Column descriptors plus row-major JSON cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub columns: Vec<RawColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Engine dropped rows beyond its result limit.
    pub truncated: bool,
}

impl RawResult {
    /// Decode into a [`TabularResult`], preserving descriptor order.
    ///
    /// Cells keep their JSON type; strings are only typed further for
    /// DATE, TIMESTAMP and BOOLEAN columns. Numeric strings stay text.
    pub fn into_table(self) -> Result<TabularResult, ShapeError> {
        let width = self.columns.len();
        let kinds: Vec<Option<String>> = self
            .columns
            .iter()
            .map(|c| c.type_name.as_deref().map(base_type))
            .collect();

        let mut columns: Vec<Column> = self
            .columns
            .into_iter()
            .map(|c| Column {
                name: c.name,
                type_name: c.type_name,
                values: Vec::with_capacity(self.rows.len()),
            })
            .collect();

        for (i, row) in self.rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ShapeError::RaggedRow {
                    row: i,
                    expected: width,
                    actual: row.len(),
                });
            }
            for ((col, kind), cell) in columns.iter_mut().zip(&kinds).zip(row) {
                col.values.push(decode_cell(cell, kind.as_deref()));
            }
        }

        TabularResult::new(columns)
    }
}

/// Lower-cased type without quotes or parameters: `"decimal(18,2)"` → `decimal`.
fn base_type(type_name: &str) -> String {
    let t = type_name.trim().trim_matches('"').to_ascii_lowercase();
    match t.find('(') {
        Some(idx) => t[..idx].to_string(),
        None => t,
    }
}

fn decode_cell(cell: serde_json::Value, kind: Option<&str>) -> Value {
    use serde_json::Value as Json;

    match cell {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => decode_string(s, kind),
        other => Value::Text(other.to_string()),
    }
}

fn decode_string(s: String, kind: Option<&str>) -> Value {
    match kind {
        Some("date") => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => Value::Text(s),
        },
        Some("timestamp") | Some("timestamp_ntz") => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(s),
        },
        Some("boolean") => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(s),
        },
        _ => Value::Text(s),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Decode a successful JSON response, or turn an error status into a [`QueryError`].
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> QueryResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(QueryError::Deserialize);
    }

    if let Ok(api) = serde_json::from_str::<protocol::ApiErrorBody>(&body) {
        if let (Some(code), Some(message)) = (api.error_code, api.message) {
            return Err(QueryError::remote(code, message));
        }
    }

    let mut body = body;
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(QueryError::Status {
        status: status.as_u16(),
        body,
    })
}
