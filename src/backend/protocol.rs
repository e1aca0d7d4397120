//! Wire types for the Databricks REST APIs.
//!
//! - SQL Statement Execution API (`/api/2.0/sql/statements`) for warehouses
//! - Command Execution API (`/api/1.2/...`) for cluster execution contexts
//! - OAuth token endpoint (`/oidc/v1/token`)

use serde::{Deserialize, Serialize};

// ============================================================================
// API error body
// ============================================================================

/// Error body returned by most workspace endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Statement Execution API
// ============================================================================

/// Request body for `POST /api/2.0/sql/statements`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteStatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    /// e.g. "30s"; the call returns early when the statement finishes.
    pub wait_timeout: String,
    /// "CONTINUE" keeps the statement running past `wait_timeout`.
    pub on_wait_timeout: String,
    pub disposition: String,
    pub format: String,
}

impl ExecuteStatementRequest {
    pub fn inline_json(statement: &str, warehouse_id: &str, wait_timeout_secs: u64) -> Self {
        Self {
            statement: statement.to_string(),
            warehouse_id: warehouse_id.to_string(),
            wait_timeout: format!("{}s", wait_timeout_secs),
            on_wait_timeout: "CONTINUE".to_string(),
            disposition: "INLINE".to_string(),
            format: "JSON_ARRAY".to_string(),
        }
    }
}

/// Statement lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

impl StatementState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatementState::Pending | StatementState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementState::Pending => "PENDING",
            StatementState::Running => "RUNNING",
            StatementState::Succeeded => "SUCCEEDED",
            StatementState::Failed => "FAILED",
            StatementState::Canceled => "CANCELED",
            StatementState::Closed => "CLOSED",
        }
    }
}

/// Error attached to a failed statement.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementStatus {
    pub state: StatementState,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

/// Column descriptor from the result manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementColumn {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementSchema {
    #[serde(default)]
    pub columns: Vec<StatementColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultManifest {
    #[serde(default)]
    pub schema: StatementSchema,
    #[serde(default)]
    pub total_chunk_count: Option<usize>,
    #[serde(default)]
    pub total_row_count: Option<u64>,
    #[serde(default)]
    pub truncated: bool,
}

/// One chunk of inline result data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub chunk_index: Option<usize>,
    #[serde(default)]
    pub row_count: Option<u64>,
    /// Cells arrive as JSON strings or null.
    #[serde(default)]
    pub data_array: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub next_chunk_internal_link: Option<String>,
}

/// Response from statement submit, status poll, or get.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
    #[serde(default)]
    pub manifest: Option<ResultManifest>,
    #[serde(default)]
    pub result: Option<ResultData>,
}

// ============================================================================
// Command Execution API (1.2)
// ============================================================================

/// Request body for `POST /api/1.2/contexts/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContextRequest {
    pub cluster_id: String,
    pub language: String,
}

/// Request body for `POST /api/1.2/contexts/destroy`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyContextRequest {
    pub cluster_id: String,
    pub context_id: String,
}

/// Request body for `POST /api/1.2/commands/execute`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    pub cluster_id: String,
    pub context_id: String,
    pub language: String,
    pub command: String,
}

/// `{"id": "..."}` returned by context and command creation.
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CommandState {
    Queued,
    Running,
    Cancelling,
    Finished,
    Cancelled,
    Error,
}

impl CommandState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandState::Finished | CommandState::Cancelled | CommandState::Error
        )
    }
}

/// Column descriptor in a command's table result.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandColumn {
    pub name: String,
    /// JSON-encoded Spark type, e.g. `"\"long\""`.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResults {
    pub result_type: String,
    #[serde(default)]
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub schema: Option<Vec<CommandColumn>>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Response from `GET /api/1.2/commands/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandStatusResponse {
    pub id: String,
    pub status: CommandState,
    #[serde(default)]
    pub results: Option<CommandResults>,
}

// ============================================================================
// OAuth
// ============================================================================

/// Response from the client-credentials token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// ============================================================================
// Paths
// ============================================================================

/// REST paths.
pub mod paths {
    pub const STATEMENTS: &str = "/api/2.0/sql/statements";
    pub const CONTEXT_CREATE: &str = "/api/1.2/contexts/create";
    pub const CONTEXT_DESTROY: &str = "/api/1.2/contexts/destroy";
    pub const COMMAND_EXECUTE: &str = "/api/1.2/commands/execute";
    pub const COMMAND_STATUS: &str = "/api/1.2/commands/status";
    pub const OAUTH_TOKEN: &str = "/oidc/v1/token";
}
