//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{"error": <code>, "message": <text>}`
//! with a non-2xx status.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use sym_core::error::SymError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - the record or its vector entry does not exist.
    NotFound { code: &'static str, message: String },
    /// 502 Bad Gateway - an upstream collaborator failed.
    Upstream { code: &'static str, message: String },
    /// 504 Gateway Timeout - a collaborator call exceeded its limit.
    Timeout(String),
    /// 500 Internal Server Error.
    Internal { code: &'static str, message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            ApiError::Upstream { code, message } => (StatusCode::BAD_GATEWAY, code, message),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", msg),
            ApiError::Internal { code, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, code, message)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = error_code, %message, "Request failed");
        }

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SymError> for ApiError {
    fn from(err: SymError) -> Self {
        let code = err.kind();
        match err {
            SymError::Validation(msg) => ApiError::BadRequest(msg),
            SymError::NotFound(message) | SymError::VectorNotFound(message) => {
                ApiError::NotFound { code, message }
            }
            SymError::Transcription(_) | SymError::Embedding(_) | SymError::Generation(_) => {
                ApiError::Upstream {
                    code,
                    message: err.to_string(),
                }
            }
            SymError::Timeout { .. } => ApiError::Timeout(err.to_string()),
            other => ApiError::Internal {
                code,
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}
