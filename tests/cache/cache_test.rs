// Metric cache tests
//
// Expiry, key independence and clearing, observed through backend call counts.

#[path = "../support/mod.rs"]
mod support;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use order_analytics::cache::ResultCache;
    use order_analytics::{Limit, MetricId, MetricParams};

    use super::support::{catalog, order, MockClient};

    const TOP_CUSTOMERS: &str = "AS customer_name";
    const KPI: &str = "AS total_customers";

    fn client() -> Arc<MockClient> {
        Arc::new(MockClient::tpch(vec![order(1, 100.0), order(2, 50.0)]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_reused_within_ttl() {
        let client = client();
        let catalog = catalog(client.clone());

        catalog.kpi_metrics().await.unwrap();
        tokio::time::advance(Duration::from_secs(3599)).await;
        catalog.kpi_metrics().await.unwrap();

        assert_eq!(client.calls_matching(KPI), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_recomputed_after_ttl() {
        let client = client();
        let catalog = catalog(client.clone());

        catalog.kpi_metrics().await.unwrap();
        tokio::time::advance(Duration::from_secs(3601)).await;
        catalog.kpi_metrics().await.unwrap();

        assert_eq!(client.calls_matching(KPI), 2);
        assert_eq!(catalog.cache_stats().expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let client = client();
        let catalog = catalog(client.clone()).with_cache(ResultCache::new(), Duration::from_secs(60));

        catalog.orders_by_status().await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        catalog.orders_by_status().await.unwrap();

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_limits_are_independent_entries() {
        let client = client();
        let catalog = catalog(client.clone());
        let five = Limit::new(5).unwrap();

        catalog.top_customers(five).await.unwrap();
        catalog.top_customers(Limit::DEFAULT).await.unwrap();
        catalog.top_customers(five).await.unwrap();

        assert_eq!(client.calls_matching(TOP_CUSTOMERS), 2);
        assert_eq!(client.calls_matching("LIMIT 5"), 1);
        assert_eq!(client.calls_matching("LIMIT 10"), 1);
    }

    #[tokio::test]
    async fn test_default_limit_shares_entry_with_explicit_default() {
        let client = client();
        let catalog = catalog(client.clone());

        catalog
            .metric(MetricId::TopCustomers, MetricParams::none())
            .await
            .unwrap();
        catalog.top_customers(Limit::DEFAULT).await.unwrap();

        assert_eq!(client.calls_matching(TOP_CUSTOMERS), 1);
    }

    #[tokio::test]
    async fn test_clear_all_is_total() {
        let client = client();
        let catalog = catalog(client.clone());

        catalog.kpi_metrics().await.unwrap();
        catalog.orders_by_priority().await.unwrap();
        catalog.top_parts(Limit::DEFAULT).await.unwrap();
        assert_eq!(client.calls(), 3);

        catalog.clear_cache();
        assert_eq!(catalog.cache_stats().entry_count, 0);

        catalog.kpi_metrics().await.unwrap();
        catalog.orders_by_priority().await.unwrap();
        catalog.top_parts(Limit::DEFAULT).await.unwrap();
        assert_eq!(client.calls(), 6);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_executes() {
        let client = client();
        let catalog = catalog(client.clone()).with_cache(ResultCache::disabled(), Duration::from_secs(3600));

        catalog.revenue_by_region().await.unwrap();
        catalog.revenue_by_region().await.unwrap();

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_health_check_never_cached() {
        let client = client();
        let catalog = catalog(client.clone());

        assert!(catalog.health_check().await);
        assert!(catalog.health_check().await);

        assert_eq!(client.calls_matching("AS health"), 2);
        assert_eq!(catalog.cache_stats().entry_count, 0);
    }
}
