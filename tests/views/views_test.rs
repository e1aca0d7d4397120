// Dashboard view tests
//
// Sections load independently: one failing query leaves the rest intact.

#[path = "../support/mod.rs"]
mod support;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use order_analytics::views::{load_view, SectionData, View, ViewOptions};
    use order_analytics::{Limit, MetricId};

    use super::support::{catalog, failing_on, order, MockClient};

    #[tokio::test]
    async fn test_failing_section_is_isolated() {
        let client = Arc::new(MockClient::new(failing_on("AS supplier_name")));
        let catalog = catalog(client);

        let report = load_view(&catalog, View::Products, ViewOptions::default()).await;

        assert_eq!(report.sections.len(), 3);
        assert_eq!(report.failures(), 1);
        assert!(!report.section(MetricId::SupplierPerformance).unwrap().is_ok());
        assert!(report.section(MetricId::TopParts).unwrap().is_ok());
        assert!(report.section(MetricId::FulfillmentMetrics).unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_overview_sections_in_order() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![order(1, 100.0), order(2, 300.0)])));

        let report = load_view(&catalog, View::Overview, ViewOptions::default()).await;
        let metrics: Vec<MetricId> = report.sections.iter().map(|s| s.metric).collect();
        assert_eq!(metrics, View::Overview.metrics());
        assert_eq!(report.failures(), 0);

        match &report.section(MetricId::KpiMetrics).unwrap().data {
            Ok(SectionData::Kpis(kpis)) => {
                assert_eq!(kpis.total_orders, 2);
                assert_eq!(kpis.avg_order_value, 200.0);
            }
            other => panic!("expected KPIs, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_view_limits_reach_queries() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());
        let options = ViewOptions {
            customers: Limit::new(15).unwrap(),
            ..ViewOptions::default()
        };

        load_view(&catalog, View::Customers, options).await;
        assert_eq!(client.calls_matching("LIMIT 15"), 1);
    }

    #[tokio::test]
    async fn test_second_load_served_from_cache() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());

        load_view(&catalog, View::Geography, ViewOptions::default()).await;
        load_view(&catalog, View::Geography, ViewOptions::default()).await;

        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_every_section_failing() {
        let client = Arc::new(MockClient::new(failing_on("FROM")));
        let catalog = catalog(client);

        let report = load_view(&catalog, View::Customers, ViewOptions::default()).await;
        assert_eq!(report.failures(), report.sections.len());
    }
}
