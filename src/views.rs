//! Dashboard views.
//!
//! A view is a fixed group of metrics rendered together. Sections load
//! concurrently and each carries its own `Result`, so a failing section never
//! hides the others.

use std::fmt;
use std::str::FromStr;

use futures::future::join_all;

use crate::catalog::{CatalogError, KpiMetrics, Limit, MetricCatalog, MetricId, MetricParams};
use crate::error::Result;
use crate::table::TabularResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Overview,
    Customers,
    Geography,
    Products,
}

impl View {
    pub const ALL: [View; 4] = [View::Overview, View::Customers, View::Geography, View::Products];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Customers => "customers",
            View::Geography => "geography",
            View::Products => "products",
        }
    }

    /// Metrics shown by this view, in display order.
    pub fn metrics(&self) -> &'static [MetricId] {
        match self {
            View::Overview => &[
                MetricId::KpiMetrics,
                MetricId::OrdersSummary,
                MetricId::OrdersByStatus,
                MetricId::OrdersByPriority,
            ],
            View::Customers => &[
                MetricId::TopCustomers,
                MetricId::MarketSegmentAnalysis,
                MetricId::MonthlyTrendBySegment,
            ],
            View::Geography => &[MetricId::RevenueByRegion],
            View::Products => &[
                MetricId::TopParts,
                MetricId::SupplierPerformance,
                MetricId::FulfillmentMetrics,
            ],
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown view '{}'", s))
    }
}

/// Row limits for the ranking sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub customers: Limit,
    pub parts: Limit,
    pub suppliers: Limit,
}

impl ViewOptions {
    /// Same limit for every ranking section.
    pub fn uniform(limit: Limit) -> Self {
        Self {
            customers: limit,
            parts: limit,
            suppliers: limit,
        }
    }

    fn limit_for(&self, id: MetricId) -> Option<Limit> {
        match id {
            MetricId::TopCustomers => Some(self.customers),
            MetricId::TopParts => Some(self.parts),
            MetricId::SupplierPerformance => Some(self.suppliers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SectionData {
    Kpis(KpiMetrics),
    Table(TabularResult),
}

#[derive(Debug)]
pub struct Section {
    pub metric: MetricId,
    pub data: Result<SectionData>,
}

impl Section {
    pub fn is_ok(&self) -> bool {
        self.data.is_ok()
    }
}

/// All sections of a loaded view.
#[derive(Debug)]
pub struct ViewReport {
    pub view: View,
    pub sections: Vec<Section>,
}

impl ViewReport {
    pub fn section(&self, metric: MetricId) -> Option<&Section> {
        self.sections.iter().find(|s| s.metric == metric)
    }

    pub fn failures(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_ok()).count()
    }
}

/// Load every section of `view` concurrently.
pub async fn load_view(catalog: &MetricCatalog, view: View, options: ViewOptions) -> ViewReport {
    let sections = join_all(
        view.metrics()
            .iter()
            .map(|&metric| load_section(catalog, metric, options)),
    )
    .await;

    ViewReport { view, sections }
}

async fn load_section(catalog: &MetricCatalog, metric: MetricId, options: ViewOptions) -> Section {
    let data = match metric {
        MetricId::KpiMetrics => catalog.kpi_metrics().await.map(SectionData::Kpis),
        MetricId::HealthCheck => Err(CatalogError::UnknownMetric(metric.to_string()).into()),
        _ => catalog
            .metric(metric, MetricParams::for_metric(metric, options.limit_for(metric)))
            .await
            .map(SectionData::Table),
    };

    if let Err(e) = &data {
        tracing::warn!(metric = %metric, error = %e, "view section failed");
    }
    Section { metric, data }
}
