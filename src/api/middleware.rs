use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ServiceType;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported query type: alerting not supported for \"{0}\"")]
    UnsupportedQueryType(String),

    #[error("{service} query failed: {message}")]
    BackendExecution {
        service: ServiceType,
        message: String,
    },

    #[error("Query cancelled: {0}")]
    Cancelled(String),

    #[error("Query deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Duplicate refId returned by more than one service: {}", .0.join(", "))]
    RefIdCollision(Vec<String>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for executor failures
    pub fn backend(service: ServiceType, message: impl Into<String>) -> Self {
        AppError::BackendExecution {
            service,
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_detail) = match self {
            AppError::UnsupportedQueryType(query_type) => {
                let details = if query_type.is_empty() {
                    "The query is missing its queryType".to_string()
                } else {
                    format!("Supported query types: {}", ServiceType::supported_list())
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail::new("UNSUPPORTED_QUERY_TYPE", message).with_details(details),
                )
            },
            AppError::BackendExecution { service, .. } => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("BACKEND_EXECUTION_ERROR", message).with_details(service.as_str()),
            ),
            AppError::Cancelled(_) => (
                StatusCode::REQUEST_TIMEOUT,
                ErrorDetail::new("QUERY_CANCELLED", message),
            ),
            AppError::DeadlineExceeded(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorDetail::new("DEADLINE_EXCEEDED", message),
            ),
            AppError::RefIdCollision(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("REF_ID_COLLISION", message),
            ),
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message),
            ),
            AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", message),
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", message),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", message),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert config::ConfigError to AppError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
