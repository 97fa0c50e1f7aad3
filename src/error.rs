//! # Error Handling
//!
//! Crate-level error type and its mapping to HTTP responses.
//!
//! ## Error Categories:
//! - **Internal**: server-side problems (500)
//! - **BadRequest / ValidationError**: client sent invalid data (400)
//! - **NotFound**: requested resource doesn't exist (404)
//! - **ConfigError**: configuration problems (500)
//! - **Upstream / UpstreamContract**: the hosted AI endpoint failed or
//!   answered outside its contract (502)
//!
//! There is deliberately no retry or backoff layer here: upstream failures
//! are reported once and surface directly to the caller.

use crate::upstream::UpstreamError;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Internal server errors
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Requested resource was not found
    NotFound(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),

    /// The upstream AI endpoint could not be reached or rejected the call
    Upstream(String),

    /// The upstream AI endpoint answered outside its response contract
    UpstreamContract(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            AppError::UpstreamContract(msg) => write!(f, "Upstream contract error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
            AppError::Upstream(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "upstream_error",
                msg.clone(),
            ),
            AppError::UpstreamContract(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "upstream_contract_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Upstream failures keep their transport/contract distinction so clients can
/// tell "the endpoint was down" from "the endpoint spoke gibberish".
impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Transport(_) | UpstreamError::Status(_, _) => {
                AppError::Upstream(err.to_string())
            }
            UpstreamError::Contract(_) => AppError::UpstreamContract(err.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_mapping() {
        let transport: AppError = UpstreamError::Transport("connection refused".to_string()).into();
        assert!(matches!(transport, AppError::Upstream(_)));

        let status: AppError = UpstreamError::Status(429, "quota".to_string()).into();
        assert!(matches!(status, AppError::Upstream(_)));

        let contract: AppError = UpstreamError::Contract("missing reply".to_string()).into();
        assert!(matches!(contract, AppError::UpstreamContract(_)));
    }

    #[test]
    fn test_status_codes() {
        use actix_web::http::StatusCode;
        assert_eq!(
            AppError::Upstream("x".to_string()).error_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::NotFound("x".to_string()).error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ValidationError("x".to_string())
                .error_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
