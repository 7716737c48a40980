//! API error handling for the LANSHARE HTTP interface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::CapacityError;
use crate::LanshareError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a payload too large error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<LanshareError> for ApiError {
    fn from(err: LanshareError) -> Self {
        match err {
            LanshareError::Validation(msg) => ApiError::bad_request(msg),
            LanshareError::Capacity(CapacityError::UploadsDisabled) => {
                ApiError::forbidden(CapacityError::UploadsDisabled.to_string())
            }
            LanshareError::Capacity(capacity) => ApiError::payload_too_large(capacity.to_string()),
            LanshareError::NotFound(msg) => ApiError::not_found(format!("{msg} not found")),
            LanshareError::Consistency(msg) => {
                tracing::error!("Consistency error: {}", msg);
                ApiError::not_found("file content is missing")
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_constructors() {
        assert_eq!(ApiError::bad_request("bad").code(), ErrorCode::BadRequest);
        assert_eq!(ApiError::forbidden("no").code(), ErrorCode::Forbidden);
        assert_eq!(ApiError::not_found("missing").code(), ErrorCode::NotFound);
        assert_eq!(
            ApiError::payload_too_large("big").code(),
            ErrorCode::PayloadTooLarge
        );
        assert_eq!(ApiError::internal("error").code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_from_lanshare_error() {
        let err: ApiError = LanshareError::Validation("missing expiry".to_string()).into();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.message(), "missing expiry");

        let err: ApiError = LanshareError::Capacity(CapacityError::UploadsDisabled).into();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert!(err.message().contains("download-only"));

        let err: ApiError = LanshareError::Capacity(CapacityError::QuotaExceeded {
            used: 60,
            requested: 50,
            quota: 100,
        })
        .into();
        assert_eq!(err.code(), ErrorCode::PayloadTooLarge);

        let err: ApiError = LanshareError::Capacity(CapacityError::FileTooLarge {
            name: "big.iso".to_string(),
            size: 2,
            limit: 1,
        })
        .into();
        assert_eq!(err.code(), ErrorCode::PayloadTooLarge);
        assert!(err.message().contains("big.iso"));

        let err: ApiError = LanshareError::NotFound("file 7".to_string()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "file 7 not found");

        let err: ApiError = LanshareError::Consistency("gone".to_string()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: ApiError = LanshareError::Database("locked".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message().contains("locked"));
    }
}
