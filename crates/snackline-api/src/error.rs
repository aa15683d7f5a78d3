//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping internal errors to appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use snackline_core::error::SnacklineError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "forbidden").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - payload is not well-formed.
    BadRequest(String),
    /// 401 Unauthorized - missing or invalid session token.
    Unauthorized(String),
    /// 403 Forbidden - authenticated but role not permitted.
    Forbidden(String),
    /// 500 Internal Server Error - storage or export failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SnacklineError> for ApiError {
    fn from(err: SnacklineError) -> Self {
        match &err {
            SnacklineError::Filter(msg) => ApiError::BadRequest(msg.clone()),
            SnacklineError::Serialization(msg) => ApiError::BadRequest(msg.clone()),
            SnacklineError::Storage(msg) => ApiError::Internal(msg.clone()),
            SnacklineError::Export(msg) => ApiError::Internal(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
