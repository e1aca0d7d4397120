//! Cluster session client over the Command Execution API.
//!
//! An execution context is created on the first query and reused by every
//! later one. When the cluster reports the context gone (after a restart) it
//! is recreated once and the command resubmitted. Closing the client
//! destroys the context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;

use super::auth::TokenProvider;
use super::error::{QueryError, QueryResult};
use super::protocol::{
    paths, CommandState, CommandStatusResponse, CreateContextRequest, DestroyContextRequest,
    ExecuteCommandRequest, IdResponse,
};
use super::{read_json, RawColumn, RawResult, SqlClient};
use crate::config::{ConnectionMode, QuerySettings, SessionTarget};

const LANGUAGE: &str = "sql";

/// The Command Execution API calls the session client is built on.
#[async_trait]
pub(crate) trait CommandApi: Send + Sync {
    /// Create an execution context, returning its id.
    async fn create_context(&self) -> QueryResult<String>;

    /// Submit a command, returning its id.
    async fn execute(&self, context_id: &str, sql: &str) -> QueryResult<String>;

    async fn status(&self, context_id: &str, command_id: &str) -> QueryResult<CommandStatusResponse>;

    async fn destroy_context(&self, context_id: &str) -> QueryResult<()>;
}

/// [`CommandApi`] over HTTPS.
struct HttpCommandApi {
    http: Client,
    base_url: String,
    cluster_id: String,
    auth: TokenProvider,
}

impl HttpCommandApi {
    async fn post<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> QueryResult<reqwest::Response> {
        let token = self.auth.token(&self.http).await?;
        Ok(self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl CommandApi for HttpCommandApi {
    async fn create_context(&self) -> QueryResult<String> {
        let request = CreateContextRequest {
            cluster_id: self.cluster_id.clone(),
            language: LANGUAGE.to_string(),
        };
        let response = self.post(paths::CONTEXT_CREATE, &request).await?;
        let created: IdResponse = read_json(response).await?;
        Ok(created.id)
    }

    async fn execute(&self, context_id: &str, sql: &str) -> QueryResult<String> {
        let request = ExecuteCommandRequest {
            cluster_id: self.cluster_id.clone(),
            context_id: context_id.to_string(),
            language: LANGUAGE.to_string(),
            command: sql.to_string(),
        };
        let response = self.post(paths::COMMAND_EXECUTE, &request).await?;
        let command: IdResponse = read_json(response).await?;
        Ok(command.id)
    }

    async fn status(&self, context_id: &str, command_id: &str) -> QueryResult<CommandStatusResponse> {
        let token = self.auth.token(&self.http).await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, paths::COMMAND_STATUS))
            .query(&[
                ("clusterId", self.cluster_id.as_str()),
                ("contextId", context_id),
                ("commandId", command_id),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn destroy_context(&self, context_id: &str) -> QueryResult<()> {
        let request = DestroyContextRequest {
            cluster_id: self.cluster_id.clone(),
            context_id: context_id.to_string(),
        };
        let response = self.post(paths::CONTEXT_DESTROY, &request).await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }
}

/// Runs SQL in an execution context on a cluster.
pub struct SessionClient {
    api: Arc<dyn CommandApi>,
    cluster_id: String,
    context_id: Mutex<Option<String>>,
    poll_interval: Duration,
}

impl SessionClient {
    /// Build a client for a validated target. The context is created lazily.
    pub fn new(target: SessionTarget, query: &QuerySettings) -> QueryResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("order-analytics/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = format!("https://{}", target.host);

        let api = HttpCommandApi {
            auth: TokenProvider::new(target.credentials, base_url.clone()),
            http,
            base_url,
            cluster_id: target.cluster_id.clone(),
        };
        Ok(Self::with_api(Arc::new(api), target.cluster_id, query.poll_interval()))
    }

    pub(crate) fn with_api(api: Arc<dyn CommandApi>, cluster_id: String, poll_interval: Duration) -> Self {
        Self {
            api,
            cluster_id,
            context_id: Mutex::new(None),
            poll_interval,
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// The current context, created on first use.
    async fn context(&self) -> QueryResult<String> {
        let mut slot = self.context_id.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let id = self.api.create_context().await.map_err(|e| {
            QueryError::Session(format!(
                "could not create execution context on cluster {}: {}",
                self.cluster_id, e
            ))
        })?;
        tracing::info!(cluster_id = %self.cluster_id, context_id = %id, "execution context created");
        *slot = Some(id.clone());
        Ok(id)
    }

    /// Drop `stale` unless another call already replaced it.
    async fn forget_context(&self, stale: &str) {
        let mut slot = self.context_id.lock().await;
        if slot.as_deref() == Some(stale) {
            *slot = None;
        }
    }

    async fn run(&self, context_id: &str, sql: &str) -> QueryResult<RawResult> {
        let command_id = self.api.execute(context_id, sql).await?;
        loop {
            let status = self.api.status(context_id, &command_id).await?;
            if status.status.is_terminal() {
                return decode_status(status);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// The cluster no longer knows the context (restart, idle eviction).
fn is_missing_context(err: &QueryError) -> bool {
    let text = match err {
        QueryError::Remote { code, message } => format!("{} {}", code, message),
        QueryError::Status { body, .. } => body.clone(),
        _ => return false,
    };
    let text = text.to_ascii_lowercase();
    text.contains("contextnotfound")
        || (text.contains("context")
            && (text.contains("not found") || text.contains("does not exist")))
}

/// Map a finished command's results to a [`RawResult`].
fn decode_status(status: CommandStatusResponse) -> QueryResult<RawResult> {
    let results = status.results.ok_or_else(|| {
        QueryError::Protocol(format!("command {} finished without results", status.id))
    })?;

    if status.status != CommandState::Finished || results.result_type == "error" {
        let message = results
            .cause
            .or(results.summary)
            .unwrap_or_else(|| "no error message returned".to_string());
        let state = match status.status {
            CommandState::Finished | CommandState::Error => "ERROR",
            _ => "CANCELLED",
        };
        return Err(QueryError::StatementFailed {
            state: state.to_string(),
            message,
        });
    }

    if results.result_type != "table" {
        return Err(QueryError::Protocol(format!(
            "expected a table result, got '{}'",
            results.result_type
        )));
    }

    let columns = results
        .schema
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let type_name = c.type_name.as_deref().map(|t| t.trim_matches('"'));
            RawColumn::new(c.name, type_name)
        })
        .collect();

    Ok(RawResult {
        columns,
        rows: results.data.unwrap_or_default(),
        truncated: results.truncated,
    })
}

#[async_trait]
impl SqlClient for SessionClient {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::ManagedSession
    }

    async fn execute(&self, sql: &str) -> QueryResult<RawResult> {
        let context_id = self.context().await?;
        match self.run(&context_id, sql).await {
            Err(e) if is_missing_context(&e) => {
                tracing::warn!(context_id = %context_id, error = %e, "execution context lost, recreating");
                self.forget_context(&context_id).await;
                let context_id = self.context().await?;
                self.run(&context_id, sql).await
            }
            outcome => outcome,
        }
    }

    /// Destroy the execution context, if one was created.
    async fn close(&self) -> QueryResult<()> {
        let Some(context_id) = self.context_id.lock().await.take() else {
            return Ok(());
        };
        self.api.destroy_context(&context_id).await?;
        tracing::debug!(context_id = %context_id, "execution context destroyed");
        Ok(())
    }
}
