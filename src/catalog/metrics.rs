//! Metric definitions: identifiers, parameters, SQL templates and output columns.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::CatalogError;
use crate::config::{ConfigError, TpchSettings};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Validated `catalog.schema` location of the TPCH tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpchSchema {
    catalog: String,
    schema: String,
}

impl TpchSchema {
    pub fn new(catalog: &str, schema: &str) -> Result<Self, ConfigError> {
        for name in [catalog, schema] {
            if !IDENTIFIER.is_match(name) {
                return Err(ConfigError::InvalidIdentifier(name.to_string()));
            }
        }
        Ok(Self {
            catalog: catalog.to_string(),
            schema: schema.to_string(),
        })
    }

    pub fn from_settings(settings: &TpchSettings) -> Result<Self, ConfigError> {
        Self::new(&settings.catalog, &settings.schema)
    }

    /// Fully qualified table path.
    pub fn table(&self, name: &str) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, name)
    }
}

impl Default for TpchSchema {
    fn default() -> Self {
        Self {
            catalog: "samples".to_string(),
            schema: "tpch".to_string(),
        }
    }
}

impl fmt::Display for TpchSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}

/// Row limit for ranking metrics, bounded to `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Limit(u32);

impl Limit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;
    pub const DEFAULT: Limit = Limit(10);

    pub fn new(value: u32) -> Result<Self, CatalogError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CatalogError::LimitOutOfRange {
                value: i64::from(value),
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Limit {
    type Error = CatalogError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(|v| Limit::new(v).ok())
            .ok_or(CatalogError::LimitOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed set of catalog metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    OrdersSummary,
    KpiMetrics,
    OrdersByStatus,
    OrdersByPriority,
    TopCustomers,
    RevenueByRegion,
    MarketSegmentAnalysis,
    TopParts,
    SupplierPerformance,
    MonthlyTrendBySegment,
    FulfillmentMetrics,
    HealthCheck,
}

impl MetricId {
    pub const ALL: [MetricId; 12] = [
        MetricId::OrdersSummary,
        MetricId::KpiMetrics,
        MetricId::OrdersByStatus,
        MetricId::OrdersByPriority,
        MetricId::TopCustomers,
        MetricId::RevenueByRegion,
        MetricId::MarketSegmentAnalysis,
        MetricId::TopParts,
        MetricId::SupplierPerformance,
        MetricId::MonthlyTrendBySegment,
        MetricId::FulfillmentMetrics,
        MetricId::HealthCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::OrdersSummary => "orders_summary",
            MetricId::KpiMetrics => "kpi_metrics",
            MetricId::OrdersByStatus => "orders_by_status",
            MetricId::OrdersByPriority => "orders_by_priority",
            MetricId::TopCustomers => "top_customers",
            MetricId::RevenueByRegion => "revenue_by_region",
            MetricId::MarketSegmentAnalysis => "market_segment_analysis",
            MetricId::TopParts => "top_parts",
            MetricId::SupplierPerformance => "supplier_performance",
            MetricId::MonthlyTrendBySegment => "monthly_trend_by_segment",
            MetricId::FulfillmentMetrics => "fulfillment_metrics",
            MetricId::HealthCheck => "health_check",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MetricId::OrdersSummary => "Monthly order count, revenue and unique customers",
            MetricId::KpiMetrics => "Headline KPIs: orders, revenue, customers, average order value",
            MetricId::OrdersByStatus => "Order distribution by status",
            MetricId::OrdersByPriority => "Order distribution by priority",
            MetricId::TopCustomers => "Top customers by total spend",
            MetricId::RevenueByRegion => "Revenue by region and nation",
            MetricId::MarketSegmentAnalysis => "Market segment performance",
            MetricId::TopParts => "Top parts by discounted revenue",
            MetricId::SupplierPerformance => "Top suppliers by supply value",
            MetricId::MonthlyTrendBySegment => "Monthly revenue by market segment",
            MetricId::FulfillmentMetrics => "Shipping mode volume and on-time performance",
            MetricId::HealthCheck => "Connectivity check",
        }
    }

    /// Ranking metrics take a row limit.
    pub fn takes_limit(&self) -> bool {
        matches!(
            self,
            MetricId::TopCustomers | MetricId::TopParts | MetricId::SupplierPerformance
        )
    }

    pub fn is_cacheable(&self) -> bool {
        !matches!(self, MetricId::HealthCheck)
    }

    /// Output columns, in order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MetricId::OrdersSummary => &[
                "order_month",
                "total_orders",
                "total_revenue",
                "avg_order_value",
                "unique_customers",
            ],
            MetricId::KpiMetrics => &[
                "total_orders",
                "total_revenue",
                "total_customers",
                "avg_order_value",
            ],
            MetricId::OrdersByStatus => &["status", "order_count", "total_value"],
            MetricId::OrdersByPriority => &["priority", "order_count", "total_value", "avg_value"],
            MetricId::TopCustomers => &[
                "customer_name",
                "market_segment",
                "nation",
                "order_count",
                "total_spent",
                "avg_order_value",
            ],
            MetricId::RevenueByRegion => &["region", "nation", "order_count", "total_revenue"],
            MetricId::MarketSegmentAnalysis => &[
                "segment",
                "customer_count",
                "order_count",
                "total_revenue",
                "avg_order_value",
            ],
            MetricId::TopParts => &["part_name", "part_type", "brand", "revenue", "quantity_sold"],
            MetricId::SupplierPerformance => &[
                "supplier_name",
                "nation",
                "orders_supplied",
                "total_supply_value",
                "avg_line_value",
            ],
            MetricId::MonthlyTrendBySegment => &["order_month", "segment", "revenue"],
            MetricId::FulfillmentMetrics => &[
                "ship_mode",
                "shipment_count",
                "avg_days_to_ship",
                "on_time_count",
                "late_count",
            ],
            MetricId::HealthCheck => &["health"],
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        MetricId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| CatalogError::UnknownMetric(s.to_string()))
    }
}

/// Parameters of one metric call. Part of the cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MetricParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
}

impl MetricParams {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Limit) -> Self {
        Self { limit: Some(limit) }
    }

    /// Canonical parameters for `id`: ranking metrics always carry a limit
    /// (the default when unset), every other metric carries none.
    pub fn for_metric(id: MetricId, limit: Option<Limit>) -> Self {
        if id.takes_limit() {
            Self::with_limit(limit.unwrap_or_default())
        } else {
            Self::none()
        }
    }

    fn limit(&self) -> Limit {
        self.limit.unwrap_or_default()
    }
}

impl fmt::Display for MetricParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "limit={}", limit),
            None => Ok(()),
        }
    }
}

/// A metric bound to a schema: renders SQL for given parameters.
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub id: MetricId,
    schema: TpchSchema,
}

impl MetricDefinition {
    pub fn new(id: MetricId, schema: TpchSchema) -> Self {
        Self { id, schema }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.id.columns()
    }

    /// Render the SQL text. Only the bounded row limit is interpolated.
    pub fn sql(&self, params: &MetricParams) -> String {
        let t = |name: &str| self.schema.table(name);

        match self.id {
            MetricId::OrdersSummary => format!(
                "SELECT
    DATE_TRUNC('month', o_orderdate) AS order_month,
    COUNT(*) AS total_orders,
    SUM(o_totalprice) AS total_revenue,
    AVG(o_totalprice) AS avg_order_value,
    COUNT(DISTINCT o_custkey) AS unique_customers
FROM {orders}
GROUP BY DATE_TRUNC('month', o_orderdate)
ORDER BY order_month",
                orders = t("orders"),
            ),
            MetricId::KpiMetrics => format!(
                "SELECT
    COUNT(*) AS total_orders,
    SUM(o_totalprice) AS total_revenue,
    COUNT(DISTINCT o_custkey) AS total_customers,
    AVG(o_totalprice) AS avg_order_value
FROM {orders}",
                orders = t("orders"),
            ),
            MetricId::OrdersByStatus => format!(
                "SELECT
    o_orderstatus AS status,
    COUNT(*) AS order_count,
    SUM(o_totalprice) AS total_value
FROM {orders}
GROUP BY o_orderstatus
ORDER BY order_count DESC",
                orders = t("orders"),
            ),
            MetricId::OrdersByPriority => format!(
                "SELECT
    o_orderpriority AS priority,
    COUNT(*) AS order_count,
    SUM(o_totalprice) AS total_value,
    AVG(o_totalprice) AS avg_value
FROM {orders}
GROUP BY o_orderpriority
ORDER BY order_count DESC",
                orders = t("orders"),
            ),
            MetricId::TopCustomers => format!(
                "SELECT
    c.c_name AS customer_name,
    c.c_mktsegment AS market_segment,
    n.n_name AS nation,
    COUNT(o.o_orderkey) AS order_count,
    SUM(o.o_totalprice) AS total_spent,
    AVG(o.o_totalprice) AS avg_order_value
FROM {orders} o
JOIN {customer} c ON o.o_custkey = c.c_custkey
JOIN {nation} n ON c.c_nationkey = n.n_nationkey
GROUP BY c.c_name, c.c_mktsegment, n.n_name
ORDER BY total_spent DESC
LIMIT {limit}",
                orders = t("orders"),
                customer = t("customer"),
                nation = t("nation"),
                limit = params.limit(),
            ),
            MetricId::RevenueByRegion => format!(
                "SELECT
    r.r_name AS region,
    n.n_name AS nation,
    COUNT(o.o_orderkey) AS order_count,
    SUM(o.o_totalprice) AS total_revenue
FROM {orders} o
JOIN {customer} c ON o.o_custkey = c.c_custkey
JOIN {nation} n ON c.c_nationkey = n.n_nationkey
JOIN {region} r ON n.n_regionkey = r.r_regionkey
GROUP BY r.r_name, n.n_name
ORDER BY total_revenue DESC",
                orders = t("orders"),
                customer = t("customer"),
                nation = t("nation"),
                region = t("region"),
            ),
            MetricId::MarketSegmentAnalysis => format!(
                "SELECT
    c.c_mktsegment AS segment,
    COUNT(DISTINCT c.c_custkey) AS customer_count,
    COUNT(o.o_orderkey) AS order_count,
    SUM(o.o_totalprice) AS total_revenue,
    AVG(o.o_totalprice) AS avg_order_value
FROM {customer} c
LEFT JOIN {orders} o ON c.c_custkey = o.o_custkey
GROUP BY c.c_mktsegment
ORDER BY total_revenue DESC",
                customer = t("customer"),
                orders = t("orders"),
            ),
            MetricId::TopParts => format!(
                "SELECT
    p.p_name AS part_name,
    p.p_type AS part_type,
    p.p_brand AS brand,
    SUM(l.l_extendedprice * (1 - l.l_discount)) AS revenue,
    SUM(l.l_quantity) AS quantity_sold
FROM {lineitem} l
JOIN {part} p ON l.l_partkey = p.p_partkey
GROUP BY p.p_name, p.p_type, p.p_brand
ORDER BY revenue DESC
LIMIT {limit}",
                lineitem = t("lineitem"),
                part = t("part"),
                limit = params.limit(),
            ),
            MetricId::SupplierPerformance => format!(
                "SELECT
    s.s_name AS supplier_name,
    n.n_name AS nation,
    COUNT(DISTINCT l.l_orderkey) AS orders_supplied,
    SUM(l.l_extendedprice) AS total_supply_value,
    AVG(l.l_extendedprice) AS avg_line_value
FROM {lineitem} l
JOIN {supplier} s ON l.l_suppkey = s.s_suppkey
JOIN {nation} n ON s.s_nationkey = n.n_nationkey
GROUP BY s.s_name, n.n_name
ORDER BY total_supply_value DESC
LIMIT {limit}",
                lineitem = t("lineitem"),
                supplier = t("supplier"),
                nation = t("nation"),
                limit = params.limit(),
            ),
            MetricId::MonthlyTrendBySegment => format!(
                "SELECT
    DATE_TRUNC('month', o.o_orderdate) AS order_month,
    c.c_mktsegment AS segment,
    SUM(o.o_totalprice) AS revenue
FROM {orders} o
JOIN {customer} c ON o.o_custkey = c.c_custkey
GROUP BY DATE_TRUNC('month', o.o_orderdate), c.c_mktsegment
ORDER BY order_month, segment",
                orders = t("orders"),
                customer = t("customer"),
            ),
            MetricId::FulfillmentMetrics => format!(
                "SELECT
    l.l_shipmode AS ship_mode,
    COUNT(*) AS shipment_count,
    AVG(DATEDIFF(l.l_shipdate, l.l_commitdate)) AS avg_days_to_ship,
    SUM(CASE WHEN l.l_shipdate <= l.l_commitdate THEN 1 ELSE 0 END) AS on_time_count,
    SUM(CASE WHEN l.l_shipdate > l.l_commitdate THEN 1 ELSE 0 END) AS late_count
FROM {lineitem} l
GROUP BY l.l_shipmode
ORDER BY shipment_count DESC",
                lineitem = t("lineitem"),
            ),
            MetricId::HealthCheck => "SELECT 1 AS health".to_string(),
        }
    }
}
