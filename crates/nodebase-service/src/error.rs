//! Error types for the nodebase daemon.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nodebase_core::AuthError;
use serde::Serialize;
use thiserror::Error;

/// Service-level errors (startup and lifecycle)
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (e.g., already exists)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// Job dispatch failures. The dispatch is a mutation's only effect, so
/// these surface to the caller as the mutation's failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatch journal write failed
    #[error("dispatch journal error: {0}")]
    Journal(#[from] StorageError),

    /// The worker queue is no longer accepting events
    #[error("job queue is closed")]
    QueueClosed,
}

/// API-surface errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session where one is required
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session present but entitlement missing
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Explicit feature guard
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job dispatch failed
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            AuthError::EntitlementRequired => ApiError::Forbidden(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ENTITLEMENT_REQUIRED"),
            ApiError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Dispatch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DISPATCH_FAILED"),
            ApiError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(StorageError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_their_status_codes() {
        assert_eq!(
            ApiError::from(AuthError::Unauthenticated)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::EntitlementRequired)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn feature_guard_maps_to_501() {
        assert_eq!(
            ApiError::NotImplemented("ai".into()).into_response().status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn dispatch_failure_is_a_server_error() {
        assert_eq!(
            ApiError::Dispatch(DispatchError::QueueClosed)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_not_found_passes_through_as_404() {
        assert_eq!(
            ApiError::Storage(StorageError::NotFound("row".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
