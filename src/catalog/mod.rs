//! Metric catalog.
//!
//! A fixed set of named aggregation queries over the TPCH schema. Each call
//! goes through the [`ResultCache`] keyed by metric and parameters, and every
//! result is checked against the metric's output columns before it is cached.
//!
//! ```text
//! catalog.top_customers(limit)
//!        │
//!        ▼
//! ResultCache ── hit ──────────────────────────────► TabularResult
//!        │ miss
//!        ▼
//! MetricDefinition::sql ─► QueryExecutor ─► column check ─► cache ─► TabularResult
//! ```
//!
//! The ad-hoc path ([`MetricCatalog::execute_custom`]) and the health check
//! bypass the cache.

mod metrics;
mod samples;

pub use metrics::{Limit, MetricDefinition, MetricId, MetricParams, TpchSchema};
pub use samples::{sample_queries, SampleQuery};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{CacheKey, CacheStats, ResultCache, DEFAULT_TTL};
use crate::config::Settings;
use crate::error::Result;
use crate::executor::{QueryExecutor, TimedResult};
use crate::resolver::ConnectionResolver;
use crate::table::{ScalarMap, TabularResult, Value};

/// Errors raised by the catalog itself.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Limit {value} out of range ({min}..={max})")]
    LimitOutOfRange { value: i64, min: u32, max: u32 },

    #[error("Metric {metric} returned columns [{}], expected [{}]", .actual.join(", "), .expected.join(", "))]
    ContractViolation {
        metric: MetricId,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Metric {0} returned no rows")]
    EmptyResult(MetricId),

    #[error("Metric {metric} column '{column}' is not numeric: {value}")]
    NonNumeric {
        metric: MetricId,
        column: String,
        value: String,
    },

    #[error("Query text is empty")]
    EmptyQuery,
}

/// Headline KPIs derived from the single-row KPI metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiMetrics {
    pub total_orders: i64,
    pub total_revenue: f64,
    pub total_customers: i64,
    pub avg_order_value: f64,
}

impl KpiMetrics {
    /// Read KPIs from a scalar map. Null aggregates (empty table) read as zero.
    pub fn from_scalars(scalars: &ScalarMap) -> std::result::Result<Self, CatalogError> {
        let number = |column: &str| -> std::result::Result<f64, CatalogError> {
            match scalars.get(column) {
                None | Some(Value::Null) => Ok(0.0),
                Some(value) => value.as_f64().ok_or_else(|| CatalogError::NonNumeric {
                    metric: MetricId::KpiMetrics,
                    column: column.to_string(),
                    value: value.to_string(),
                }),
            }
        };

        Ok(Self {
            total_orders: number("total_orders")?.round() as i64,
            total_revenue: number("total_revenue")?,
            total_customers: number("total_customers")?.round() as i64,
            avg_order_value: number("avg_order_value")?,
        })
    }
}

/// Entry point for all metric, ad-hoc and health queries.
pub struct MetricCatalog {
    executor: QueryExecutor,
    cache: ResultCache,
    schema: TpchSchema,
    ttl: Duration,
}

impl MetricCatalog {
    pub fn new(executor: QueryExecutor, schema: TpchSchema) -> Self {
        Self {
            executor,
            cache: ResultCache::new(),
            schema,
            ttl: DEFAULT_TTL,
        }
    }

    /// Replace the cache and its time-to-live.
    pub fn with_cache(mut self, cache: ResultCache, ttl: Duration) -> Self {
        self.cache = cache;
        self.ttl = ttl;
        self
    }

    /// Build a catalog from settings over a shared resolver.
    pub fn from_settings(settings: &Settings, resolver: Arc<ConnectionResolver>) -> Result<Self> {
        let schema = TpchSchema::from_settings(&settings.tpch)?;
        let executor = QueryExecutor::new(resolver).with_timeout(settings.query.timeout());
        let cache = if settings.cache.enabled {
            ResultCache::new()
        } else {
            ResultCache::disabled()
        };
        Ok(Self::new(executor, schema).with_cache(cache, settings.cache.ttl()))
    }

    pub fn schema(&self) -> &TpchSchema {
        &self.schema
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn definition(&self, id: MetricId) -> MetricDefinition {
        MetricDefinition::new(id, self.schema.clone())
    }

    /// Run a metric by identifier, using the cache when the metric allows it.
    pub async fn metric(&self, id: MetricId, params: MetricParams) -> Result<TabularResult> {
        let params = MetricParams::for_metric(id, params.limit);
        if !id.is_cacheable() {
            return self.run(id, params).await;
        }

        let key = CacheKey::new(id.as_str(), params.to_string());
        self.cache
            .get_or_compute(key, self.ttl, || self.run(id, params))
            .await
    }

    async fn run(&self, id: MetricId, params: MetricParams) -> Result<TabularResult> {
        let definition = self.definition(id);
        let result = self.executor.execute(&definition.sql(&params)).await?;
        check_columns(id, &result)?;
        Ok(result)
    }

    pub async fn orders_summary(&self) -> Result<TabularResult> {
        self.metric(MetricId::OrdersSummary, MetricParams::none()).await
    }

    /// KPI row as a column → value map.
    pub async fn kpi_scalars(&self) -> Result<ScalarMap> {
        let table = self.metric(MetricId::KpiMetrics, MetricParams::none()).await?;
        Ok(table
            .first_row_map()
            .ok_or(CatalogError::EmptyResult(MetricId::KpiMetrics))?)
    }

    pub async fn kpi_metrics(&self) -> Result<KpiMetrics> {
        Ok(KpiMetrics::from_scalars(&self.kpi_scalars().await?)?)
    }

    pub async fn orders_by_status(&self) -> Result<TabularResult> {
        self.metric(MetricId::OrdersByStatus, MetricParams::none()).await
    }

    pub async fn orders_by_priority(&self) -> Result<TabularResult> {
        self.metric(MetricId::OrdersByPriority, MetricParams::none()).await
    }

    pub async fn top_customers(&self, limit: Limit) -> Result<TabularResult> {
        self.metric(MetricId::TopCustomers, MetricParams::with_limit(limit)).await
    }

    pub async fn revenue_by_region(&self) -> Result<TabularResult> {
        self.metric(MetricId::RevenueByRegion, MetricParams::none()).await
    }

    pub async fn market_segment_analysis(&self) -> Result<TabularResult> {
        self.metric(MetricId::MarketSegmentAnalysis, MetricParams::none()).await
    }

    pub async fn top_parts(&self, limit: Limit) -> Result<TabularResult> {
        self.metric(MetricId::TopParts, MetricParams::with_limit(limit)).await
    }

    pub async fn supplier_performance(&self, limit: Limit) -> Result<TabularResult> {
        self.metric(MetricId::SupplierPerformance, MetricParams::with_limit(limit)).await
    }

    pub async fn monthly_trend_by_segment(&self) -> Result<TabularResult> {
        self.metric(MetricId::MonthlyTrendBySegment, MetricParams::none()).await
    }

    pub async fn fulfillment_metrics(&self) -> Result<TabularResult> {
        self.metric(MetricId::FulfillmentMetrics, MetricParams::none()).await
    }

    /// Run arbitrary SQL. Never cached.
    pub async fn execute_custom(&self, sql: &str) -> Result<TimedResult> {
        if sql.trim().is_empty() {
            return Err(CatalogError::EmptyQuery.into());
        }
        self.executor.execute_timed(sql).await
    }

    /// Check the backend. Any failure reads as unhealthy.
    pub async fn health_check(&self) -> bool {
        match self.metric(MetricId::HealthCheck, MetricParams::none()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn connection_info(&self) -> &'static str {
        self.executor.resolver().connection_info()
    }

    pub fn sample_queries(&self) -> Vec<SampleQuery> {
        sample_queries(&self.schema)
    }
}

/// Column names must match the metric's output columns, in order.
fn check_columns(id: MetricId, result: &TabularResult) -> std::result::Result<(), CatalogError> {
    let actual = result.column_names();
    let expected = id.columns();
    let matches = actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.eq_ignore_ascii_case(e));

    if matches {
        Ok(())
    } else {
        Err(CatalogError::ContractViolation {
            metric: id,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            actual: actual.iter().map(|s| s.to_string()).collect(),
        })
    }
}
