//! readaloud error types

use std::time::Duration;

/// Crate-level error type.
///
/// Layer errors ([`GatewayError`], [`StoreError`], [`BatchError`]) convert into
/// this via `?`; most callers only meet it at startup or at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ReadaloudError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single call to the chat-completion gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// API key absent, a placeholder, or too short. Raised without network I/O.
    #[error("AI gateway is not configured")]
    Unconfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The envelope lacked `choices[0].message.content`, or the content did not
    /// parse into the expected structure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unconfigured => "unconfigured",
            GatewayError::Network(_) => "network",
            GatewayError::Http { .. } => "http",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::MalformedResponse(_) => "malformed",
        }
    }

    /// Whether this is a transport-level failure (network or timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Timeout(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::MalformedResponse(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Row and blob store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors that stop a batch run before any item is processed.
///
/// Per-item failures never show up here; they are recorded in the report.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("book not found: {0}")]
    BookNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for readaloud operations
pub type Result<T> = std::result::Result<T, ReadaloudError>;
