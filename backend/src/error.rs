//! Error handling for the Inventory Management Platform
//!
//! Provides consistent JSON error responses across all endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Login code errors (see services::auth for the lifecycle)
    #[error("No matching login code")]
    CodeNoMatch,

    #[error("Login code expired or already used")]
    CodeExpiredOrUsed,

    #[error("Too many attempts, code is locked")]
    CodeLocked,

    #[error("Could not deliver login code: {0}")]
    DeliveryFailed(String),

    #[error("Invalid Google token: {0}")]
    GoogleTokenInvalid(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    // External service errors
    #[error("AI service error: {0}")]
    AiServiceError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message: "Invalid email or password".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message: "You do not have permission to perform this action".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::CodeNoMatch => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_CODE".to_string(),
                    message: "Invalid or expired code".to_string(),
                    field: None,
                },
            ),
            AppError::CodeExpiredOrUsed => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "CODE_EXPIRED".to_string(),
                    message: "Invalid or expired code".to_string(),
                    field: None,
                },
            ),
            AppError::CodeLocked => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorDetail {
                    code: "CODE_LOCKED".to_string(),
                    message: "Too many attempts. Try again later.".to_string(),
                    field: None,
                },
            ),
            AppError::DeliveryFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "DELIVERY_FAILED".to_string(),
                    message: format!("Failed to send email: {}", msg),
                    field: None,
                },
            ),
            AppError::GoogleTokenInvalid(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "GOOGLE_TOKEN_INVALID".to_string(),
                    message: format!("Invalid Google token: {}", msg),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::AiServiceError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "AI_SERVICE_ERROR".to_string(),
                    message: format!("AI service error: {}", msg),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message: format!("Configuration error: {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
