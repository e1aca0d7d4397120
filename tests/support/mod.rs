//! Shared test doubles: a scripted `SqlClient`, a factory that hands it out,
//! and an in-memory TPCH orders table that answers the KPI query.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use order_analytics::backend::{QueryError, QueryResult, RawColumn, RawResult, SqlClient};
use order_analytics::catalog::{MetricCatalog, TpchSchema};
use order_analytics::config::{ConfigError, ConnectionConfig, ConnectionMode};
use order_analytics::resolver::{ClientFactory, ConnectionResolver, EnvLookup};
use order_analytics::QueryExecutor;
use regex::Regex;
use serde_json::json;

type Responder = dyn Fn(&str) -> QueryResult<RawResult> + Send + Sync;

/// A `SqlClient` answering from a closure and counting calls.
pub struct MockClient {
    mode: ConnectionMode,
    responder: Box<Responder>,
    calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> QueryResult<RawResult> + Send + Sync + 'static,
    {
        Self {
            mode: ConnectionMode::WarehouseSql,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Client answering every catalog query over `orders`.
    pub fn tpch(orders: Vec<Order>) -> Self {
        Self::new(move |sql| tpch_response(&orders, sql))
    }

    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of executions whose SQL contains `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|sql| sql.contains(fragment))
            .count()
    }
}

#[async_trait]
impl SqlClient for MockClient {
    fn mode(&self) -> ConnectionMode {
        self.mode
    }

    async fn execute(&self, sql: &str) -> QueryResult<RawResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().unwrap().push(sql.to_string());
        (self.responder)(sql)
    }
}

/// Factory returning a shared mock client, optionally failing first.
pub struct MockFactory {
    client: Arc<MockClient>,
    failures_left: AtomicUsize,
    builds: AtomicUsize,
}

impl MockFactory {
    pub fn new(client: Arc<MockClient>) -> Self {
        Self {
            client,
            failures_left: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` constructions with a configuration error.
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Construction attempts, successful or not.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ClientFactory for MockFactory {
    fn create(
        &self,
        _mode: ConnectionMode,
        _config: &ConnectionConfig,
    ) -> order_analytics::Result<Arc<dyn SqlClient>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ConfigError::MissingCredentials.into());
        }
        Ok(self.client.clone())
    }
}

/// Environment lookup over a fixed set of variables.
pub fn env(vars: &[(&str, &str)]) -> EnvLookup {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(move |key: &str| vars.get(key).cloned())
}

/// Warehouse environment that passes validation.
pub fn warehouse_env() -> EnvLookup {
    env(&[
        ("DATABRICKS_HOST", "adb-123.azuredatabricks.net"),
        ("DATABRICKS_TOKEN", "dapi-test"),
        ("DATABRICKS_WAREHOUSE_ID", "abc123"),
    ])
}

/// Catalog over `client` with the default schema and cache.
pub fn catalog(client: Arc<MockClient>) -> MetricCatalog {
    let resolver = Arc::new(ConnectionResolver::with_lookup(
        warehouse_env(),
        Arc::new(MockFactory::new(client)),
    ));
    MetricCatalog::new(QueryExecutor::new(resolver), TpchSchema::default())
}

/// One row of the orders table.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub custkey: i64,
    pub totalprice: f64,
}

pub fn order(custkey: i64, totalprice: f64) -> Order {
    Order { custkey, totalprice }
}

/// Strings everywhere, the way the warehouse API delivers cells.
fn text(value: impl ToString) -> serde_json::Value {
    json!(value.to_string())
}

fn tpch_response(orders: &[Order], sql: &str) -> QueryResult<RawResult> {
    if sql.contains("AS total_customers") {
        return Ok(kpi_result(orders));
    }
    Ok(alias_result(sql))
}

fn kpi_result(orders: &[Order]) -> RawResult {
    let count = orders.len();
    let revenue: f64 = orders.iter().map(|o| o.totalprice).sum();
    let mut customers: Vec<i64> = orders.iter().map(|o| o.custkey).collect();
    customers.sort_unstable();
    customers.dedup();

    let (revenue_cell, avg_cell) = if count == 0 {
        (json!(null), json!(null))
    } else {
        (
            text(format!("{:.2}", revenue)),
            text(format!("{:.6}", revenue / count as f64)),
        )
    };

    RawResult {
        columns: vec![
            RawColumn::new("total_orders", Some("LONG")),
            RawColumn::new("total_revenue", Some("DECIMAL(28,2)")),
            RawColumn::new("total_customers", Some("LONG")),
            RawColumn::new("avg_order_value", Some("DECIMAL(22,6)")),
        ],
        rows: vec![vec![
            text(count),
            revenue_cell,
            text(customers.len()),
            avg_cell,
        ]],
        truncated: false,
    }
}

/// One row whose columns are the `AS` aliases of `sql`, in order.
pub fn alias_result(sql: &str) -> RawResult {
    let alias = Regex::new(r"(?i)\bAS\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let columns: Vec<RawColumn> = alias
        .captures_iter(sql)
        .map(|c| RawColumn::new(&c[1], Some("STRING")))
        .collect();
    let row = (0..columns.len()).map(|i| text(i + 1)).collect();

    RawResult {
        columns,
        rows: vec![row],
        truncated: false,
    }
}

/// Responder that fails every query containing `fragment`.
pub fn failing_on(fragment: &'static str) -> impl Fn(&str) -> QueryResult<RawResult> + Send + Sync {
    move |sql| {
        if sql.contains(fragment) {
            Err(QueryError::StatementFailed {
                state: "FAILED".to_string(),
                message: format!("[TABLE_OR_VIEW_NOT_FOUND] near {}", fragment),
            })
        } else {
            Ok(alias_result(sql))
        }
    }
}
