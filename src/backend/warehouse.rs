//! SQL warehouse client over the Statement Execution API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::auth::TokenProvider;
use super::error::{QueryError, QueryResult};
use super::protocol::{
    paths, ExecuteStatementRequest, ResultData, StatementResponse, StatementState,
};
use super::{read_json, RawColumn, RawResult, SqlClient};
use crate::config::{ConnectionMode, QuerySettings, WarehouseTarget};

/// The Statement Execution API calls the client's polling loop is built on.
#[async_trait]
pub(crate) trait StatementApi: Send + Sync {
    async fn submit(&self, sql: &str) -> QueryResult<StatementResponse>;

    async fn poll(&self, statement_id: &str) -> QueryResult<StatementResponse>;

    /// Fetch the chunk behind a `next_chunk_internal_link`.
    async fn fetch_chunk(&self, link: &str) -> QueryResult<ResultData>;

    async fn cancel(&self, statement_id: &str) -> QueryResult<()>;
}

/// [`StatementApi`] over HTTPS.
struct HttpStatementApi {
    http: Client,
    base_url: String,
    warehouse_id: String,
    auth: TokenProvider,
    wait_timeout_secs: u64,
}

#[async_trait]
impl StatementApi for HttpStatementApi {
    async fn submit(&self, sql: &str) -> QueryResult<StatementResponse> {
        let token = self.auth.token(&self.http).await?;
        let body = ExecuteStatementRequest::inline_json(sql, &self.warehouse_id, self.wait_timeout_secs);

        let response = self
            .http
            .post(format!("{}{}", self.base_url, paths::STATEMENTS))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn poll(&self, statement_id: &str) -> QueryResult<StatementResponse> {
        let token = self.auth.token(&self.http).await?;
        let response = self
            .http
            .get(format!("{}{}/{}", self.base_url, paths::STATEMENTS, statement_id))
            .bearer_auth(token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_chunk(&self, link: &str) -> QueryResult<ResultData> {
        let token = self.auth.token(&self.http).await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, link))
            .bearer_auth(token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn cancel(&self, statement_id: &str) -> QueryResult<()> {
        let token = self.auth.token(&self.http).await?;
        let response = self
            .http
            .post(format!("{}{}/{}/cancel", self.base_url, paths::STATEMENTS, statement_id))
            .bearer_auth(token)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        read_json::<serde_json::Value>(response).await.map(|_| ())
    }
}

/// Cancels a still-running statement when the waiting future is dropped.
struct CancelOnDrop {
    api: Arc<dyn StatementApi>,
    statement_id: Option<String>,
}

impl CancelOnDrop {
    fn disarm(&mut self) {
        self.statement_id = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        let Some(statement_id) = self.statement_id.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        tracing::info!(statement_id = %statement_id, "statement abandoned, cancelling");
        let api = Arc::clone(&self.api);
        handle.spawn(async move {
            if let Err(e) = api.cancel(&statement_id).await {
                tracing::warn!(statement_id = %statement_id, error = %e, "failed to cancel statement");
            }
        });
    }
}

/// Runs statements on a SQL warehouse.
///
/// Each call submits the statement, waits up to `wait_timeout` server-side,
/// then polls until the statement reaches a terminal state. Inline result
/// chunks are followed until the last one. A call dropped before the
/// statement finishes (for example by a timeout) cancels it.
pub struct WarehouseClient {
    api: Arc<dyn StatementApi>,
    http_path: String,
    poll_interval: Duration,
}

impl WarehouseClient {
    /// Build a client for a validated target. No request is made until the first query.
    pub fn new(target: WarehouseTarget, query: &QuerySettings) -> QueryResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("order-analytics/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = format!("https://{}", target.host);

        let api = HttpStatementApi {
            auth: TokenProvider::new(target.credentials, base_url.clone()),
            http,
            base_url,
            warehouse_id: target.warehouse_id,
            wait_timeout_secs: query.wait_timeout_seconds,
        };
        Ok(Self::with_api(Arc::new(api), target.http_path, query.poll_interval()))
    }

    pub(crate) fn with_api(api: Arc<dyn StatementApi>, http_path: String, poll_interval: Duration) -> Self {
        Self {
            api,
            http_path,
            poll_interval,
        }
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }

    async fn collect(&self, response: StatementResponse) -> QueryResult<RawResult> {
        let manifest = response.manifest.ok_or_else(|| {
            QueryError::Protocol(format!(
                "statement {} succeeded without a result manifest",
                response.statement_id
            ))
        })?;

        let mut descriptors = manifest.schema.columns;
        descriptors.sort_by_key(|c| c.position.unwrap_or(usize::MAX));
        let columns = descriptors
            .into_iter()
            .map(|c| RawColumn::new(c.name, c.type_name.as_deref()))
            .collect();

        let mut rows = Vec::new();
        let mut next = match response.result {
            Some(chunk) => {
                rows.extend(chunk.data_array);
                chunk.next_chunk_internal_link
            }
            None => None,
        };
        while let Some(link) = next {
            let chunk = self.api.fetch_chunk(&link).await?;
            rows.extend(chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }

        tracing::debug!(
            statement_id = %response.statement_id,
            rows = rows.len(),
            "statement result collected"
        );

        Ok(RawResult {
            columns,
            rows,
            truncated: manifest.truncated,
        })
    }
}

#[async_trait]
impl SqlClient for WarehouseClient {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::WarehouseSql
    }

    async fn execute(&self, sql: &str) -> QueryResult<RawResult> {
        let mut response = self.api.submit(sql).await?;
        tracing::debug!(
            statement_id = %response.statement_id,
            state = response.status.state.as_str(),
            "statement submitted"
        );

        let mut guard = CancelOnDrop {
            api: Arc::clone(&self.api),
            statement_id: Some(response.statement_id.clone()),
        };
        while !response.status.state.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            response = self.api.poll(&response.statement_id).await?;
        }
        guard.disarm();

        match response.status.state {
            StatementState::Succeeded => self.collect(response).await,
            state => {
                let message = response
                    .status
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "no error message returned".to_string());
                Err(QueryError::StatementFailed {
                    state: state.as_str().to_string(),
                    message,
                })
            }
        }
    }
}
