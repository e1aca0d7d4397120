// Settings file tests

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use order_analytics::config::SettingsError;
    use order_analytics::{
        ConnectionResolver, DatabricksClientFactory, Error, MetricCatalog, Settings,
    };

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("order-analytics-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn resolver() -> Arc<ConnectionResolver> {
        Arc::new(ConnectionResolver::with_lookup(
            Arc::new(|_: &str| None::<String>),
            Arc::new(DatabricksClientFactory::default()),
        ))
    }

    #[test]
    fn test_load_from_file() {
        let path = write_config(
            "full",
            r#"
[tpch]
catalog = "main"
schema = "tpch_sf10"

[cache]
ttl_seconds = 600

[query]
timeout_seconds = 120
wait_timeout_seconds = 10

[logging]
level = "debug"
format = "json"
"#,
        );

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.tpch.catalog, "main");
        assert_eq!(settings.tpch.schema, "tpch_sf10");
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(600));
        assert_eq!(settings.query.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(settings.query.poll_interval(), Duration::from_millis(500));
        assert_eq!(settings.logging.format, "json");

        let catalog = MetricCatalog::from_settings(&settings, resolver()).unwrap();
        assert_eq!(catalog.schema().table("orders"), "main.tpch_sf10.orders");
        assert_eq!(catalog.ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file("/nonexistent/order-analytics.toml").unwrap_err();
        assert!(matches!(err, SettingsError::FileNotFound(_)));
    }

    #[test]
    fn test_wait_timeout_out_of_range() {
        let err = Settings::from_toml("[query]\nwait_timeout_seconds = 120\n").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_schema_identifier_is_configuration_error() {
        let settings = Settings::from_toml("[tpch]\nschema = \"tpch; DROP TABLE x\"\n").unwrap();

        let err = MetricCatalog::from_settings(&settings, resolver()).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_disabled_cache_setting() {
        let settings = Settings::from_toml("[cache]\nenabled = false\n").unwrap();
        assert!(!settings.cache.enabled);
        assert!(MetricCatalog::from_settings(&settings, resolver()).is_ok());
    }
}
