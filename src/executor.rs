//! SQL execution through the resolved client.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::backend::QueryError;
use crate::cache::fingerprint;
use crate::error::Result;
use crate::normalize::normalize;
use crate::resolver::ConnectionResolver;
use crate::table::TabularResult;

/// A normalized result plus execution metadata.
#[derive(Debug, Clone)]
pub struct TimedResult {
    pub result: TabularResult,
    pub elapsed: Duration,
    pub query_id: Uuid,
    /// The engine dropped rows beyond its result limit.
    pub truncated: bool,
}

/// Runs SQL text and returns normalized tabular results.
///
/// No retries happen here; failures go straight back to the caller.
pub struct QueryExecutor {
    resolver: Arc<ConnectionResolver>,
    timeout: Option<Duration>,
}

impl QueryExecutor {
    pub fn new(resolver: Arc<ConnectionResolver>) -> Self {
        Self {
            resolver,
            timeout: None,
        }
    }

    /// Bound every `execute` call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &Arc<ConnectionResolver> {
        &self.resolver
    }

    pub async fn execute(&self, sql: &str) -> Result<TabularResult> {
        Ok(self.execute_timed(sql).await?.result)
    }

    /// Execute and report elapsed time alongside the result.
    pub async fn execute_timed(&self, sql: &str) -> Result<TimedResult> {
        let client = self.resolver.current_client()?;
        let query_id = Uuid::new_v4();
        let sql_hash = fingerprint(sql);
        let started = Instant::now();

        tracing::debug!(
            query_id = %query_id,
            sql_hash = %sql_hash,
            mode = %client.mode(),
            "executing query"
        );
        tracing::trace!(query_id = %query_id, sql = %sql);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, client.execute(sql)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(QueryError::Timeout(limit.as_secs())),
            },
            None => client.execute(sql).await,
        };

        let raw = outcome.map_err(|e| {
            tracing::warn!(query_id = %query_id, sql_hash = %sql_hash, error = %e, "query failed");
            e
        })?;

        let truncated = raw.truncated;
        let table = raw
            .into_table()
            .map_err(|e| QueryError::Protocol(e.to_string()))?;
        let result = normalize(table);
        let elapsed = started.elapsed();

        tracing::info!(
            query_id = %query_id,
            sql_hash = %sql_hash,
            rows = result.num_rows(),
            elapsed_ms = elapsed.as_millis() as u64,
            "query completed"
        );
        if truncated {
            tracing::warn!(query_id = %query_id, "result was truncated by the engine");
        }

        Ok(TimedResult {
            result,
            elapsed,
            query_id,
            truncated,
        })
    }
}
