//! TOML-based configuration.
//!
//! Supports a config file (order-analytics.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [tpch]
//! catalog = "samples"
//! schema = "tpch"
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 3600
//!
//! [query]
//! timeout_seconds = 300
//! wait_timeout_seconds = 30
//! poll_interval_ms = 500
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ORDER_ANALYTICS_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Location of the TPCH tables.
    pub tpch: TpchSettings,

    /// Metric result caching.
    pub cache: CacheSettings,

    /// Query execution.
    pub query: QuerySettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Catalog and schema holding the TPCH tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TpchSettings {
    pub catalog: String,
    pub schema: String,
}

impl Default for TpchSettings {
    fn default() -> Self {
        Self {
            catalog: "samples".to_string(),
            schema: "tpch".to_string(),
        }
    }
}

/// Metric cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Enable metric caching.
    pub enabled: bool,

    /// Cache TTL in seconds.
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Query execution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Overall bound on a single `execute()` call. Unset means no bound.
    pub timeout_seconds: Option<u64>,

    /// Server-side wait before a statement call returns (5..=50).
    pub wait_timeout_seconds: u64,

    /// Delay between status polls for long-running statements.
    pub poll_interval_ms: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            wait_timeout_seconds: 30,
            poll_interval_ms: 500,
        }
    }
}

impl QuerySettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level directive (overridden by `RUST_LOG`).
    pub level: String,

    /// "compact" or "json".
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text, expanding environment variables.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.tpch.catalog = expand_env_vars(&settings.tpch.catalog)?;
        settings.tpch.schema = expand_env_vars(&settings.tpch.schema)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ORDER_ANALYTICS_CONFIG`
    /// 2. `./order-analytics.toml`
    /// 3. `~/.config/order-analytics/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("order-analytics.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("order-analytics").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(5..=50).contains(&self.query.wait_timeout_seconds) {
            return Err(SettingsError::InvalidConfig(format!(
                "query.wait_timeout_seconds must be between 5 and 50, got {}",
                self.query.wait_timeout_seconds
            )));
        }
        if self.query.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidConfig(
                "query.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Lone '$'
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
