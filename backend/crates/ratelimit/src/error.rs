//! Rate Limiter Error Types
//!
//! This module provides limiter-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! A denied request is NOT an error: denials are reported through
//! [`crate::domain::entities::ConsumeOutcome`] so they can carry the
//! header metadata. Only infrastructure and caller faults live here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Rate-limiter result type alias
pub type RlResult<T> = Result<T, RateLimitError>;

/// Rate-limiter error variants
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Caller identity could not be determined (empty identifier or
    /// unresolvable client IP). Never treated as a rate-limit denial.
    #[error("Cannot determine client identity")]
    MissingIdentifier,

    /// A policy failed startup validation (zero capacity, zero window,
    /// bad or duplicate namespace)
    #[error("Misconfigured rate limit policy: {0}")]
    InvalidPolicy(String),

    /// Bucket store error
    #[error("Bucket store error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RateLimitError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RateLimitError::MissingIdentifier => StatusCode::INTERNAL_SERVER_ERROR,
            RateLimitError::InvalidPolicy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RateLimitError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateLimitError::MissingIdentifier => ErrorKind::InternalServerError,
            RateLimitError::InvalidPolicy(_) => ErrorKind::InternalServerError,
            RateLimitError::Database(_) => ErrorKind::ServiceUnavailable,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            RateLimitError::Database(e) => {
                tracing::error!(error = %e, "Bucket store error");
            }
            RateLimitError::InvalidPolicy(msg) => {
                tracing::error!(message = %msg, "Misconfigured rate limit policy");
            }
            RateLimitError::MissingIdentifier => {
                tracing::error!("Request reached rate limiter without a resolvable client identity");
            }
        }
    }
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

impl From<platform::client::ClientIdError> for RateLimitError {
    fn from(err: platform::client::ClientIdError) -> Self {
        match err {
            platform::client::ClientIdError::Unresolvable => RateLimitError::MissingIdentifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RateLimitError::MissingIdentifier.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RateLimitError::InvalidPolicy("capacity is zero".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = RateLimitError::MissingIdentifier.into();
        assert_eq!(err.status_code(), 500);

        let err: AppError = RateLimitError::InvalidPolicy("duplicate namespace".into()).into();
        assert!(err.message().contains("duplicate namespace"));
    }

    #[test]
    fn test_client_id_error_conversion() {
        let err: RateLimitError = platform::client::ClientIdError::Unresolvable.into();
        assert!(matches!(err, RateLimitError::MissingIdentifier));
    }
}
