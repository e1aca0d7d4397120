// Connection resolver tests
//
// Mode selection over every combination of the four environment signals,
// memoization of the mode and of clients, and configuration failures.

#[path = "../support/mod.rs"]
mod support;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use order_analytics::config::{
        ENV_CLUSTER_ID, ENV_HOST, ENV_HTTP_PATH, ENV_RUNTIME_VERSION, ENV_TOKEN, ENV_WAREHOUSE_ID,
    };
    use order_analytics::resolver::EnvLookup;
    use order_analytics::{ConnectionMode, ConnectionResolver, DatabricksClientFactory, Error};

    use super::support::{env, MockClient, MockFactory};

    fn resolver(lookup: EnvLookup) -> ConnectionResolver {
        ConnectionResolver::with_lookup(lookup, Arc::new(DatabricksClientFactory::default()))
    }

    /// Lookup whose contents can change after the resolver is built.
    fn mutable_env() -> (Arc<RwLock<HashMap<String, String>>>, EnvLookup) {
        let vars = Arc::new(RwLock::new(HashMap::new()));
        let reader = Arc::clone(&vars);
        let lookup: EnvLookup = Arc::new(move |key: &str| reader.read().unwrap().get(key).cloned());
        (vars, lookup)
    }

    #[test]
    fn test_mode_for_every_signal_combination() {
        for bits in 0u8..16 {
            let runtime = bits & 1 != 0;
            let warehouse = bits & 2 != 0;
            let path = bits & 4 != 0;
            let cluster = bits & 8 != 0;

            let mut vars = Vec::new();
            if runtime {
                vars.push((ENV_RUNTIME_VERSION, "15.4"));
            }
            if warehouse {
                vars.push((ENV_WAREHOUSE_ID, "abc123"));
            }
            if path {
                vars.push((ENV_HTTP_PATH, "/sql/1.0/warehouses/abc123"));
            }
            if cluster {
                vars.push((ENV_CLUSTER_ID, "0101-123456-abcdef"));
            }

            let expected = if runtime {
                ConnectionMode::ManagedSession
            } else if warehouse || path {
                ConnectionMode::WarehouseSql
            } else if cluster {
                ConnectionMode::ManagedSession
            } else {
                ConnectionMode::WarehouseSql
            };

            assert_eq!(
                resolver(env(&vars)).resolve_mode(),
                expected,
                "runtime={} warehouse={} path={} cluster={}",
                runtime,
                warehouse,
                path,
                cluster
            );
        }
    }

    #[test]
    fn test_empty_signal_counts_as_absent() {
        let r = resolver(env(&[
            (ENV_RUNTIME_VERSION, ""),
            (ENV_WAREHOUSE_ID, ""),
            (ENV_CLUSTER_ID, "0101-123456-abcdef"),
        ]));
        assert_eq!(r.resolve_mode(), ConnectionMode::ManagedSession);
    }

    #[test]
    fn test_mode_memoized_until_reset() {
        let (vars, lookup) = mutable_env();
        let r = resolver(lookup);
        assert_eq!(r.resolve_mode(), ConnectionMode::WarehouseSql);

        vars.write()
            .unwrap()
            .insert(ENV_CLUSTER_ID.to_string(), "0101-123456-abcdef".to_string());
        assert_eq!(r.resolve_mode(), ConnectionMode::WarehouseSql);

        r.reset();
        assert_eq!(r.resolve_mode(), ConnectionMode::ManagedSession);
    }

    #[test]
    fn test_client_built_once() {
        let factory = Arc::new(MockFactory::new(Arc::new(MockClient::tpch(vec![]))));
        let r = ConnectionResolver::with_lookup(env(&[]), factory.clone());

        let first = r.current_client().unwrap();
        let second = r.current_client().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.builds(), 1);
    }

    #[test]
    fn test_failed_build_is_retried() {
        let factory = Arc::new(MockFactory::new(Arc::new(MockClient::tpch(vec![]))).failing(1));
        let r = ConnectionResolver::with_lookup(env(&[]), factory.clone());

        assert!(r.current_client().is_err());
        assert!(r.current_client().is_ok());
        assert_eq!(factory.builds(), 2);
    }

    #[test]
    fn test_reset_drops_clients() {
        let factory = Arc::new(MockFactory::new(Arc::new(MockClient::tpch(vec![]))));
        let r = ConnectionResolver::with_lookup(env(&[]), factory.clone());

        r.current_client().unwrap();
        r.reset();
        r.current_client().unwrap();

        assert_eq!(factory.builds(), 2);
    }

    #[test]
    fn test_token_only_is_configuration_error() {
        let r = resolver(env(&[(ENV_TOKEN, "dapi-test")]));
        assert_eq!(r.resolve_mode(), ConnectionMode::WarehouseSql);

        let err = r.current_client().err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let r = resolver(env(&[
            (ENV_HOST, "adb-1.azuredatabricks.net"),
            (ENV_WAREHOUSE_ID, "abc123"),
        ]));
        assert!(r.current_client().err().unwrap().is_configuration());
    }

    #[test]
    fn test_oauth_credentials_accepted() {
        let r = resolver(env(&[
            (ENV_HOST, "adb-1.azuredatabricks.net"),
            ("DATABRICKS_CLIENT_ID", "sp-id"),
            ("DATABRICKS_CLIENT_SECRET", "sp-secret"),
            (ENV_WAREHOUSE_ID, "abc123"),
        ]));
        assert!(r.current_client().is_ok());
    }

    #[test]
    fn test_connection_info_follows_mode() {
        let r = resolver(env(&[(ENV_CLUSTER_ID, "0101-123456-abcdef")]));
        assert_eq!(r.connection_info(), "Classic Cluster (Databricks Connect)");
    }

    #[tokio::test]
    async fn test_close_forgets_clients() {
        let factory = Arc::new(MockFactory::new(Arc::new(MockClient::tpch(vec![]))));
        let r = ConnectionResolver::with_lookup(env(&[]), factory.clone());

        r.current_client().unwrap();
        r.close().await;
        r.current_client().unwrap();

        assert_eq!(factory.builds(), 2);
    }
}
