//! Error Types for the Vanish API
//!
//! This module defines error handling for the HTTP layer:
//! - `ErrorCode` for categorizing failures and mapping them to statuses
//! - `ApiError` as the JSON error body
//! - conversions from the core taxonomy and from PostgreSQL errors
//!
//! Server-side failures are opaque to callers; their detail goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use vanish_core::{CodecError, StorageError, ValidationError, VanishError};

use crate::telemetry::metrics;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 403, 404)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request body could not be understood
    InvalidInput,

    /// Secret exceeds the configured size limit
    SecretTooLarge,

    /// Requested lifetime is out of range
    InvalidLifetime,

    /// Supplied passphrase does not match
    InvalidPassphrase,

    /// Secret never existed, was consumed or has expired
    SecretNotFound,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// A storage tier is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::SecretTooLarge
            | ErrorCode::InvalidLifetime => StatusCode::BAD_REQUEST,

            ErrorCode::InvalidPassphrase => StatusCode::FORBIDDEN,

            ErrorCode::SecretNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input",
            ErrorCode::SecretTooLarge => "Secret is too large",
            ErrorCode::InvalidLifetime => "Invalid secret lifetime",
            ErrorCode::InvalidPassphrase => "Invalid passphrase",
            ErrorCode::SecretNotFound => "Secret not found",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Database connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn not_found() -> Self {
        Self::from_code(ErrorCode::SecretNotFound)
    }

    pub fn invalid_passphrase() -> Self {
        Self::from_code(ErrorCode::InvalidPassphrase)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::SecretTooLarge { .. } => ErrorCode::SecretTooLarge,
            ValidationError::InvalidLifetime { .. } => ErrorCode::InvalidLifetime,
            ValidationError::EmptyPassphrase => ErrorCode::ValidationFailed,
        };
        let details = match &err {
            ValidationError::SecretTooLarge { size, max } => {
                Some(serde_json::json!({ "size": size, "max": max }))
            }
            ValidationError::InvalidLifetime { seconds, .. } => {
                Some(serde_json::json!({ "ttl_seconds": seconds }))
            }
            ValidationError::EmptyPassphrase => None,
        };
        let api_err = ApiError::new(code, err.to_string());
        match details {
            Some(details) => api_err.with_details(details),
            None => api_err,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let tier = err.tier();
        tracing::error!(tier = %tier, error = %err, "Storage tier failure");
        if let Some(m) = metrics() {
            m.record_store_error(tier);
        }

        match err {
            StorageError::Unavailable { .. } => {
                ApiError::service_unavailable(format!("The {tier} store is unavailable"))
            }
            StorageError::Corrupted { .. } | StorageError::LockPoisoned { .. } => {
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        tracing::error!(error = %err, "Stored payload failed to decode");
        ApiError::from_code(ErrorCode::InternalError)
    }
}

/// Convert the core taxonomy: client-facing kinds keep their meaning, all
/// others become opaque server failures.
impl From<VanishError> for ApiError {
    fn from(err: VanishError) -> Self {
        match err {
            VanishError::NotFound => ApiError::not_found(),
            VanishError::Forbidden => ApiError::invalid_passphrase(),
            VanishError::Validation(e) => e.into(),
            VanishError::Storage(e) => e.into(),
            VanishError::Codec(e) => e.into(),
            VanishError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);

        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
