//! Error types for the HTTP API.
//!
//! Every handler and service returns [`ApiError`]; axum turns it into a JSON
//! error envelope via [`IntoResponse`]:
//!
//! ```json
//! { "error": { "code": "NOT_FOUND", "message": "Invoice not found: ..." } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use factuur_core::CoreError;
use factuur_db::DbError;

/// Machine-readable error codes, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    NotFound,
    Conflict,
    MailDelivery,
    PdfRender,
    Internal,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::MailDelivery => StatusCode::BAD_GATEWAY,
            ErrorCode::PdfRender => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error: a code plus a human-readable message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::NotFound,
            message: message.into(),
        }
    }

    pub fn mail_delivery(message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::MailDelivery,
            message: message.into(),
        }
    }

    pub fn pdf_render(message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::PdfRender,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            code: ErrorCode::Internal,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = ?self.code, message = %self.message, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidationFailed,
            CoreError::InvoiceNotFound(_) | CoreError::CustomerNotFound(_) => ErrorCode::NotFound,
            // Surfaced only after the retry bound is exhausted.
            CoreError::NumberAllocationExhausted { .. } => ErrorCode::Conflict,
        };
        ApiError {
            code,
            message: err.to_string(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let code = match &err {
            DbError::NotFound { .. } => ErrorCode::NotFound,
            DbError::UniqueViolation { .. } => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        };
        ApiError {
            code,
            message: err.to_string(),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
