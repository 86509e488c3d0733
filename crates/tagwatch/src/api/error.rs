//! API error types and response handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - The tracker has not produced data yet.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

impl ApiError {
    /// No snapshot has been published yet.
    #[must_use]
    pub fn no_snapshot() -> Self {
        Self::ServiceUnavailable {
            error_code: "no_snapshot".to_string(),
            message: "No snapshot has been published yet; the first scan window is still running"
                .to_string(),
        }
    }

    /// The address is not in the latest snapshot.
    #[must_use]
    pub fn device_not_found(address: &str) -> Self {
        Self::NotFound {
            error_code: "device_not_found".to_string(),
            message: format!("Device not tracked: {address}"),
        }
    }
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "device_not_found",
    "message": "Device not tracked: AA:BB:CC:DD:EE:FF"
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "device_not_found")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Device not tracked: AA:BB:CC:DD:EE:FF")]
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            Self::NotFound { error_code, message } => (StatusCode::NOT_FOUND, error_code, message),
            Self::ServiceUnavailable { error_code, message } => {
                (StatusCode::SERVICE_UNAVAILABLE, error_code, message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_code,
                message,
            }),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
