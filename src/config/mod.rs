//! Configuration module.
//!
//! Handles Databricks connection environment, TOML settings, and env expansion.

mod connection;
mod settings;

pub use connection::{
    normalize_host, warehouse_id_from_path, ConfigError, ConnectionConfig, ConnectionMode,
    Credentials, SessionTarget, WarehouseTarget, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_CLUSTER_ID,
    ENV_HOST, ENV_HTTP_PATH, ENV_RUNTIME_CLUSTER_ID, ENV_RUNTIME_VERSION, ENV_TOKEN,
    ENV_WAREHOUSE_ID, REMEDIATION,
};
pub use settings::{
    expand_env_vars, CacheSettings, LoggingSettings, QuerySettings, Settings, SettingsError,
    TpchSettings, CONFIG_ENV,
};
