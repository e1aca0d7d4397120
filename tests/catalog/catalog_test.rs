// Metric catalog tests
//
// KPI derivation against an in-memory orders table, output column contracts,
// health probing and configuration failures surfacing through the catalog.

#[path = "../support/mod.rs"]
mod support;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use order_analytics::backend::{QueryError, RawColumn, RawResult};
    use order_analytics::catalog::CatalogError;
    use order_analytics::config::ENV_TOKEN;
    use order_analytics::{
        ConnectionResolver, DatabricksClientFactory, Error, KpiMetrics, Limit, MetricCatalog,
        MetricId, MetricParams, QueryExecutor, Value,
    };
    use serde_json::json;

    use super::support::{alias_result, catalog, env, order, MockClient};

    #[tokio::test]
    async fn test_kpis_over_three_orders() {
        let client = Arc::new(MockClient::tpch(vec![
            order(1, 100.0),
            order(1, 200.0),
            order(2, 300.0),
        ]));
        let catalog = catalog(client);

        let kpis = catalog.kpi_metrics().await.unwrap();
        assert_eq!(
            kpis,
            KpiMetrics {
                total_orders: 3,
                total_revenue: 600.0,
                total_customers: 2,
                avg_order_value: 200.0,
            }
        );
    }

    #[tokio::test]
    async fn test_kpis_over_empty_table_read_as_zero() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![])));

        let kpis = catalog.kpi_metrics().await.unwrap();
        assert_eq!(kpis.total_orders, 0);
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.avg_order_value, 0.0);
    }

    #[tokio::test]
    async fn test_kpi_scalars_are_numeric() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![order(7, 150.5)])));

        let scalars = catalog.kpi_scalars().await.unwrap();
        assert_eq!(scalars["total_orders"], Value::Int(1));
        assert_eq!(scalars["total_revenue"], Value::Float(150.5));
    }

    #[tokio::test]
    async fn test_every_metric_matches_its_columns() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![order(1, 10.0)])));

        for id in MetricId::ALL {
            let result = catalog
                .metric(id, MetricParams::none())
                .await
                .unwrap_or_else(|e| panic!("{} failed: {}", id, e));
            assert_eq!(result.column_names(), id.columns(), "{}", id);
        }
    }

    #[tokio::test]
    async fn test_ranking_metrics_render_limit() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());
        let limit = Limit::new(7).unwrap();

        catalog.top_customers(limit).await.unwrap();
        catalog.top_parts(limit).await.unwrap();
        catalog.supplier_performance(limit).await.unwrap();

        assert_eq!(client.calls_matching("LIMIT 7"), 3);
    }

    #[tokio::test]
    async fn test_queries_target_configured_schema() {
        let client = Arc::new(MockClient::tpch(vec![]));
        let catalog = catalog(client.clone());

        catalog.orders_summary().await.unwrap();
        assert_eq!(client.calls_matching("FROM samples.tpch.orders"), 1);
    }

    #[tokio::test]
    async fn test_contract_violation() {
        let client = Arc::new(MockClient::new(|_sql: &str| {
            Ok(RawResult {
                columns: vec![RawColumn::new("status", None), RawColumn::new("n", None)],
                rows: vec![vec![json!("F"), json!(1)]],
                truncated: false,
            })
        }));
        let catalog = catalog(client);

        let err = catalog.orders_by_status().await.unwrap_err();
        match err {
            Error::Catalog(CatalogError::ContractViolation { metric, actual, .. }) => {
                assert_eq!(metric, MetricId::OrdersByStatus);
                assert_eq!(actual, vec!["status", "n"]);
            }
            other => panic!("expected contract violation, got {:?}", other),
        }
        assert_eq!(catalog.cache_stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_column_check_ignores_case() {
        let client = Arc::new(MockClient::new(|sql: &str| {
            let mut raw = alias_result(sql);
            for column in &mut raw.columns {
                column.name = column.name.to_uppercase();
            }
            Ok(raw)
        }));
        let catalog = catalog(client);

        assert!(catalog.orders_by_priority().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_metric_not_cached() {
        let client = Arc::new(MockClient::new(|_sql: &str| {
            Err(QueryError::StatementFailed {
                state: "FAILED".to_string(),
                message: "[TABLE_OR_VIEW_NOT_FOUND]".to_string(),
            })
        }));
        let catalog = catalog(client.clone());

        assert!(catalog.fulfillment_metrics().await.is_err());
        assert!(catalog.fulfillment_metrics().await.is_err());
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_health_check_true() {
        let catalog = catalog(Arc::new(MockClient::tpch(vec![])));
        assert!(catalog.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_on_query_error() {
        let client = Arc::new(MockClient::new(|_sql: &str| {
            Err(QueryError::Status {
                status: 503,
                body: "warehouse stopped".to_string(),
            })
        }));
        assert!(!catalog(client).health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_without_configuration() {
        let resolver = Arc::new(ConnectionResolver::with_lookup(
            env(&[(ENV_TOKEN, "dapi-test")]),
            Arc::new(DatabricksClientFactory::default()),
        ));
        let catalog = MetricCatalog::new(QueryExecutor::new(resolver), Default::default());

        assert!(!catalog.health_check().await);
        let err = catalog.orders_summary().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_metric_ids_parse() {
        assert_eq!("top-customers".parse::<MetricId>().unwrap(), MetricId::TopCustomers);
        assert_eq!("KPI_METRICS".parse::<MetricId>().unwrap(), MetricId::KpiMetrics);
        assert!(matches!(
            "revenue".parse::<MetricId>(),
            Err(CatalogError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_limit_bounds() {
        assert!(Limit::try_from(0i64).is_err());
        assert!(Limit::try_from(101i64).is_err());
        assert_eq!(Limit::try_from(25i64).unwrap().get(), 25);
    }
}
