//! Backend-specific error types.

use thiserror::Error;

/// Result type for backend operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while running a query against the backend.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Transport failure talking to the workspace.
    #[error("request to workspace failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Workspace answered with a non-success HTTP status.
    #[error("workspace returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Workspace returned a structured API error.
    #[error("workspace error: {message} (code: {code})")]
    Remote {
        /// Error code from the API.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Statement ran but did not succeed (syntax error, missing table, ...).
    #[error("statement {state}: {message}")]
    StatementFailed {
        /// Terminal state reported by the engine.
        state: String,
        /// Engine error message.
        message: String,
    },

    /// Failed to decode a response body.
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Could not obtain an access token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Query did not finish in time.
    #[error("query timed out after {0} seconds")]
    Timeout(u64),

    /// Execution context could not be created or was lost.
    #[error("session error: {0}")]
    Session(String),

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl QueryError {
    /// Create a remote error from an API error body.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retriable by the caller.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialize(err)
    }
}
