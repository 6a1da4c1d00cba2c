//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::{BatchError, StoreError};

const ERROR_INVALID_PARAMETER: &str = "invalid_parameter";
const ERROR_UNAUTHORIZED: &str = "unauthorized";
const ERROR_FORBIDDEN: &str = "forbidden";
const ERROR_NOT_FOUND: &str = "not_found";
const ERROR_UNAVAILABLE: &str = "storage_unavailable";
const ERROR_INTERNAL: &str = "internal";

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// An error rendered as `{error, message, field?}` with a status code.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            body: ApiErrorBody {
                error,
                message: message.into(),
                field: None,
            },
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.body.field = Some(field.to_string());
        self
    }

    pub fn invalid_param(field: &str, message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ERROR_INVALID_PARAMETER, message).with_field(field)
    }

    pub fn missing(field: &str) -> Self {
        ApiError::invalid_param(field, format!("`{field}` is required"))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, ERROR_UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        ApiError::new(
            StatusCode::FORBIDDEN,
            ERROR_FORBIDDEN,
            "this route requires an admin token",
        )
    }

    pub fn not_found(field: &str, message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, ERROR_NOT_FOUND, message).with_field(field)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, ERROR_UNAVAILABLE, message)
    }

    pub fn internal() -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ERROR_INTERNAL,
            "internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                ApiError::new(StatusCode::NOT_FOUND, ERROR_NOT_FOUND, format!("{entity} `{id}` not found"))
            }
            StoreError::Backend(message) => {
                tracing::error!(error = %message, "storage backend failed");
                ApiError::unavailable("storage is unavailable")
            }
            StoreError::Decode(message) => {
                tracing::error!(error = %message, "stored row did not decode");
                ApiError::internal()
            }
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::BookNotFound(id) => {
                ApiError::not_found("bookId", format!("book `{id}` not found"))
            }
            BatchError::Store(e) => e.into(),
        }
    }
}

/// Trimmed non-empty string, or a 400 naming `field`.
pub fn require_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    let value = value.ok_or_else(|| ApiError::missing(field))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_param(field, format!("`{field}` must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed value, with blanks treated as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
