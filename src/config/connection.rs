//! Databricks connection configuration.
//!
//! Supports configuration via environment variables:
//! - `DATABRICKS_RUNTIME_VERSION`: Set by the managed runtime (forces session mode)
//! - `DATABRICKS_WAREHOUSE_ID`: SQL warehouse ID
//! - `DATABRICKS_HTTP_PATH`: Explicit wire path (e.g. `/sql/1.0/warehouses/abc`)
//! - `DATABRICKS_CLUSTER_ID`: All-purpose cluster ID
//! - `DB_CLUSTER_ID`: Cluster ID exported by the managed runtime (read only inside it)
//! - `DATABRICKS_HOST`: Workspace hostname (scheme optional)
//! - `DATABRICKS_TOKEN`: Personal access token
//! - `DATABRICKS_CLIENT_ID` / `DATABRICKS_CLIENT_SECRET`: OAuth service principal

use std::env;
use std::fmt;

pub const ENV_RUNTIME_VERSION: &str = "DATABRICKS_RUNTIME_VERSION";
pub const ENV_WAREHOUSE_ID: &str = "DATABRICKS_WAREHOUSE_ID";
pub const ENV_HTTP_PATH: &str = "DATABRICKS_HTTP_PATH";
pub const ENV_CLUSTER_ID: &str = "DATABRICKS_CLUSTER_ID";
pub const ENV_RUNTIME_CLUSTER_ID: &str = "DB_CLUSTER_ID";
pub const ENV_HOST: &str = "DATABRICKS_HOST";
pub const ENV_TOKEN: &str = "DATABRICKS_TOKEN";
pub const ENV_CLIENT_ID: &str = "DATABRICKS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DATABRICKS_CLIENT_SECRET";

/// Wire-path prefix for serverless / pro SQL warehouses.
const WAREHOUSE_PATH_PREFIX: &str = "/sql/1.0/warehouses/";

/// Guidance shown when the backend cannot be reached.
pub const REMEDIATION: &str = "\
For local development set environment variables:
  - DATABRICKS_HOST (e.g. xxx.cloud.databricks.com)
  - DATABRICKS_TOKEN (or DATABRICKS_CLIENT_ID + DATABRICKS_CLIENT_SECRET)
  - DATABRICKS_WAREHOUSE_ID (or DATABRICKS_HTTP_PATH, e.g. /sql/1.0/warehouses/xxx)
    OR DATABRICKS_CLUSTER_ID for a classic all-purpose cluster
Inside the managed runtime the host, service principal and cluster
(DB_CLUSTER_ID) are injected by the runtime.";

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Missing credentials: set DATABRICKS_TOKEN or DATABRICKS_CLIENT_ID + DATABRICKS_CLIENT_SECRET")]
    MissingCredentials,

    #[error("Missing warehouse: set DATABRICKS_WAREHOUSE_ID or DATABRICKS_HTTP_PATH")]
    MissingWarehouse,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid identifier '{0}': only letters, digits and underscores are allowed")]
    InvalidIdentifier(String),

    #[error("Managed runtime detected but it provides no {}", .missing.join(", "))]
    RuntimeContext { missing: Vec<&'static str> },
}

/// Backend access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionMode {
    /// Direct SQL-over-wire to a SQL warehouse.
    WarehouseSql,
    /// Session on a classic cluster (or the managed app runtime).
    ManagedSession,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::WarehouseSql => "warehouse_sql",
            ConnectionMode::ManagedSession => "managed_session",
        }
    }

    /// Human readable description for status displays.
    pub fn description(&self) -> &'static str {
        match self {
            ConnectionMode::WarehouseSql => "SQL Warehouse (Serverless)",
            ConnectionMode::ManagedSession => "Classic Cluster (Databricks Connect)",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication material.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token.
    Token(String),
    /// OAuth machine-to-machine service principal.
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

// Secrets never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

/// Snapshot of the Databricks connection environment.
///
/// All fields are optional here; each mode validates what it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Managed runtime marker (`DATABRICKS_RUNTIME_VERSION`).
    pub runtime_version: Option<String>,
    /// Workspace hostname without scheme.
    pub host: Option<String>,
    /// Authentication, token preferred over OAuth.
    pub credentials: Option<Credentials>,
    /// SQL warehouse ID.
    pub warehouse_id: Option<String>,
    /// Explicit wire path.
    pub http_path: Option<String>,
    /// All-purpose cluster ID.
    pub cluster_id: Option<String>,
}

/// Validated warehouse target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseTarget {
    pub host: String,
    pub http_path: String,
    pub warehouse_id: String,
    pub credentials: Credentials,
}

/// Validated cluster session target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub host: String,
    pub cluster_id: String,
    pub credentials: Credentials,
}

impl ConnectionConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let credentials = match (get(ENV_TOKEN), get(ENV_CLIENT_ID), get(ENV_CLIENT_SECRET)) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(client_id), Some(client_secret)) => Some(Credentials::OAuth {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let runtime_version = get(ENV_RUNTIME_VERSION);
        // The runtime's own cluster variable never selects a mode outside it.
        let cluster_id = get(ENV_CLUSTER_ID).or_else(|| {
            runtime_version
                .as_ref()
                .and_then(|_| get(ENV_RUNTIME_CLUSTER_ID))
        });

        Self {
            runtime_version,
            host: get(ENV_HOST).map(|h| normalize_host(&h)).filter(|h| !h.is_empty()),
            credentials,
            warehouse_id: get(ENV_WAREHOUSE_ID),
            http_path: get(ENV_HTTP_PATH),
            cluster_id,
        }
    }

    /// Decide the access mode. First match wins:
    /// runtime marker, warehouse, cluster, default warehouse.
    pub fn preferred_mode(&self) -> ConnectionMode {
        if self.runtime_version.is_some() {
            ConnectionMode::ManagedSession
        } else if self.warehouse_id.is_some() || self.http_path.is_some() {
            ConnectionMode::WarehouseSql
        } else if self.cluster_id.is_some() {
            ConnectionMode::ManagedSession
        } else {
            ConnectionMode::WarehouseSql
        }
    }

    /// Wire path, explicit path first, otherwise derived from the warehouse ID.
    pub fn warehouse_path(&self) -> Option<String> {
        self.http_path.clone().or_else(|| {
            self.warehouse_id
                .as_ref()
                .map(|id| format!("{}{}", WAREHOUSE_PATH_PREFIX, id))
        })
    }

    /// Validate everything the warehouse client needs.
    pub fn warehouse_target(&self) -> Result<WarehouseTarget, ConfigError> {
        let host = self
            .host
            .clone()
            .ok_or(ConfigError::MissingEnvVar(ENV_HOST))?;
        let credentials = self
            .credentials
            .clone()
            .ok_or(ConfigError::MissingCredentials)?;
        let http_path = self.warehouse_path().ok_or(ConfigError::MissingWarehouse)?;

        let warehouse_id = match &self.warehouse_id {
            Some(id) => id.clone(),
            None => warehouse_id_from_path(&http_path).ok_or_else(|| {
                ConfigError::InvalidConfig(format!(
                    "http path '{}' does not name a SQL warehouse",
                    http_path
                ))
            })?,
        };

        Ok(WarehouseTarget {
            host,
            http_path,
            warehouse_id,
            credentials,
        })
    }

    /// Validate everything the cluster session needs.
    ///
    /// Inside the managed runtime the host, service principal and cluster are
    /// injected by the runtime; the error then names every value it lacks.
    pub fn session_target(&self) -> Result<SessionTarget, ConfigError> {
        match (&self.host, &self.credentials, &self.cluster_id) {
            (Some(host), Some(credentials), Some(cluster_id)) => Ok(SessionTarget {
                host: host.clone(),
                cluster_id: cluster_id.clone(),
                credentials: credentials.clone(),
            }),
            _ if self.runtime_version.is_some() => {
                let mut missing = Vec::new();
                if self.host.is_none() {
                    missing.push("workspace host (DATABRICKS_HOST)");
                }
                if self.credentials.is_none() {
                    missing.push("credentials (DATABRICKS_CLIENT_ID + DATABRICKS_CLIENT_SECRET)");
                }
                if self.cluster_id.is_none() {
                    missing.push("cluster (DB_CLUSTER_ID or DATABRICKS_CLUSTER_ID)");
                }
                Err(ConfigError::RuntimeContext { missing })
            }
            (None, _, _) => Err(ConfigError::MissingEnvVar(ENV_HOST)),
            (_, None, _) => Err(ConfigError::MissingCredentials),
            (_, _, None) => Err(ConfigError::MissingEnvVar(ENV_CLUSTER_ID)),
        }
    }
}

/// Strip scheme and trailing slashes from a workspace host.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

/// Extract the warehouse ID from a `/sql/1.0/warehouses/{id}` path.
pub fn warehouse_id_from_path(path: &str) -> Option<String> {
    let id = path
        .trim_end_matches('/')
        .strip_prefix(WAREHOUSE_PATH_PREFIX)?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id.to_string())
    }
}
