//! Connection mode selection and lazy client construction.
//!
//! The resolver reads the Databricks environment once per lifetime to decide
//! between a SQL warehouse and a cluster session, then builds the matching
//! client on first use. Both decisions are memoized until [`ConnectionResolver::reset`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::backend::{SessionClient, SqlClient, WarehouseClient};
use crate::config::{ConnectionConfig, ConnectionMode, QuerySettings};
use crate::error::Result;

/// Variable lookup used to read connection settings.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds a client for a mode from the current configuration.
///
/// Implementations must validate configuration before touching the network.
pub trait ClientFactory: Send + Sync {
    fn create(&self, mode: ConnectionMode, config: &ConnectionConfig) -> Result<Arc<dyn SqlClient>>;
}

/// Factory producing real workspace clients.
#[derive(Debug, Clone, Default)]
pub struct DatabricksClientFactory {
    query: QuerySettings,
}

impl DatabricksClientFactory {
    pub fn new(query: QuerySettings) -> Self {
        Self { query }
    }
}

impl ClientFactory for DatabricksClientFactory {
    fn create(&self, mode: ConnectionMode, config: &ConnectionConfig) -> Result<Arc<dyn SqlClient>> {
        match mode {
            ConnectionMode::WarehouseSql => {
                let target = config.warehouse_target()?;
                tracing::info!(
                    host = %target.host,
                    http_path = %target.http_path,
                    "connecting to SQL warehouse"
                );
                Ok(Arc::new(WarehouseClient::new(target, &self.query)?))
            }
            ConnectionMode::ManagedSession => {
                let target = config.session_target()?;
                tracing::info!(
                    host = %target.host,
                    cluster_id = %target.cluster_id,
                    managed_runtime = config.runtime_version.is_some(),
                    "connecting to cluster session"
                );
                Ok(Arc::new(SessionClient::new(target, &self.query)?))
            }
        }
    }
}

/// Decides the connection mode and owns the per-mode clients.
///
/// Share one instance by `Arc`; clients are read-only once built.
pub struct ConnectionResolver {
    lookup: EnvLookup,
    factory: Arc<dyn ClientFactory>,
    mode: RwLock<Option<ConnectionMode>>,
    clients: Mutex<HashMap<ConnectionMode, Arc<dyn SqlClient>>>,
}

impl ConnectionResolver {
    /// Resolver reading the process environment.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self::with_lookup(Arc::new(|key: &str| std::env::var(key).ok()), factory)
    }

    /// Resolver reading variables through `lookup`.
    pub fn with_lookup(lookup: EnvLookup, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            lookup,
            factory,
            mode: RwLock::new(None),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of the connection settings as currently visible.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::from_lookup(|key| (self.lookup)(key))
    }

    /// The access mode, computed on first call and memoized.
    pub fn resolve_mode(&self) -> ConnectionMode {
        if let Some(mode) = *self.mode.read().unwrap_or_else(PoisonError::into_inner) {
            return mode;
        }

        let mut slot = self.mode.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(mode) = *slot {
            return mode;
        }
        let mode = self.config().preferred_mode();
        tracing::info!(mode = %mode, "resolved connection mode");
        *slot = Some(mode);
        mode
    }

    /// Client for `mode`, built on first request.
    ///
    /// A failed construction is not remembered; the next call tries again.
    pub fn client(&self, mode: ConnectionMode) -> Result<Arc<dyn SqlClient>> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&mode) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.create(mode, &self.config()).map_err(|e| {
            tracing::warn!(mode = %mode, error = %e, "client construction failed");
            e
        })?;
        clients.insert(mode, Arc::clone(&client));
        Ok(client)
    }

    /// Client for the resolved mode.
    pub fn current_client(&self) -> Result<Arc<dyn SqlClient>> {
        self.client(self.resolve_mode())
    }

    /// Human readable name of the resolved mode.
    pub fn connection_info(&self) -> &'static str {
        self.resolve_mode().description()
    }

    /// Forget the memoized mode and drop all clients.
    pub fn reset(&self) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!("connection resolver reset");
    }

    /// Close and drop every client built so far.
    pub async fn close(&self) {
        let clients: Vec<_> = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (mode, client) in clients {
            if let Err(e) = client.close().await {
                tracing::warn!(mode = %mode, error = %e, "failed to close client");
            }
        }
    }
}
