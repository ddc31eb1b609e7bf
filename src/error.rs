//! Error handling module
//!
//! The ledger's error taxonomy and its HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;
use crate::lock::LockError;
use crate::store::StoreError;

/// Ledger-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error kinds
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Lock acquisition failed: {0}")]
    LockAcquisitionFailed(String),

    // Server errors (5xx)
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl LedgerError {
    pub fn account_not_found(account_id: uuid::Uuid) -> Self {
        LedgerError::ResourceNotFound(format!("account {} not found", account_id))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::InternalServerError(err.to_string())
    }
}

impl From<LockError> for LedgerError {
    fn from(err: LockError) -> Self {
        LedgerError::InternalServerError(err.to_string())
    }
}

impl From<ConfigError> for LedgerError {
    fn from(err: ConfigError) -> Self {
        LedgerError::InternalServerError(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            LedgerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 403 Forbidden
            LedgerError::NotAllowed(msg) => {
                (StatusCode::FORBIDDEN, "not_allowed", Some(msg.clone()))
            }

            // 404 Not Found
            LedgerError::ResourceNotFound(msg) => {
                (StatusCode::NOT_FOUND, "resource_not_found", Some(msg.clone()))
            }

            // 409 Conflict
            LedgerError::LockAcquisitionFailed(msg) => {
                (StatusCode::CONFLICT, "lock_acquisition_failed", Some(msg.clone()))
            }

            // 422 Unprocessable Entity
            LedgerError::InvalidOperation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_operation", Some(msg.clone()))
            }

            // 500 Internal Server Error
            LedgerError::InternalServerError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let error = match &self {
            // do not leak backend details to callers
            LedgerError::InternalServerError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
