// Ad-hoc query tests
//
// Custom SQL always reaches the backend and reports timing metadata.

#[path = "../support/mod.rs"]
mod support;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use order_analytics::backend::{RawColumn, RawResult};
    use order_analytics::catalog::CatalogError;
    use order_analytics::{Error, Value};
    use serde_json::json;

    use super::support::{catalog, failing_on, MockClient};

    const SQL: &str = "SELECT o_orderstatus AS status, COUNT(*) AS n FROM samples.tpch.orders GROUP BY 1";

    #[tokio::test]
    async fn test_identical_queries_execute_twice() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());

        let first = catalog.execute_custom(SQL).await.unwrap();
        let second = catalog.execute_custom(SQL).await.unwrap();

        assert_eq!(client.calls(), 2);
        assert_eq!(catalog.cache_stats().entry_count, 0);
        assert_ne!(first.query_id, second.query_id);
    }

    #[tokio::test]
    async fn test_result_is_normalized() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![])));

        let outcome = catalog.execute_custom(SQL).await.unwrap();
        assert_eq!(outcome.result.column_names(), vec!["status", "n"]);
        assert_eq!(outcome.result.get(0, 1), Some(&Value::Int(2)));
        assert!(!outcome.truncated);
    }

    #[tokio::test]
    async fn test_truncation_reported() {
        let client = Arc::new(MockClient::new(|_sql: &str| {
            Ok(RawResult {
                columns: vec![RawColumn::new("x", Some("INT"))],
                rows: vec![vec![json!(1)]],
                truncated: true,
            })
        }));
        let outcome = catalog(client).execute_custom("SELECT 1 AS x").await.unwrap();
        assert!(outcome.truncated);
    }

    #[tokio::test]
    async fn test_empty_sql_rejected_without_request() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());

        let err = catalog.execute_custom("   \n").await.unwrap_err();
        assert!(matches!(err, Error::Catalog(CatalogError::EmptyQuery)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_engine_error_returned() {
        let client = Arc::new(MockClient::new(failing_on("missing_table")));
        let catalog = catalog(client);

        let err = catalog
            .execute_custom("SELECT * FROM missing_table")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
        assert!(err.to_string().contains("TABLE_OR_VIEW_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_custom_sql_does_not_touch_metric_cache() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());

        catalog.orders_by_status().await.unwrap();
        let sql = catalog.definition(order_analytics::MetricId::OrdersByStatus).sql(&Default::default());
        catalog.execute_custom(&sql).await.unwrap();
        catalog.orders_by_status().await.unwrap();

        assert_eq!(client.calls(), 2);
        assert_eq!(catalog.cache_stats().entry_count, 1);
    }
}
