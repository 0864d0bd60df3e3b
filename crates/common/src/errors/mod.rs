//! Error types for YaMDb services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses with field-level details
//! - Error codes for client handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Field name → human readable messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    ValidationError,
    InvalidFormat,

    // Authentication errors
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors
    Forbidden,

    // Resource errors
    NotFound,
    UserNotFound,
    CategoryNotFound,
    GenreNotFound,
    TitleNotFound,
    ReviewNotFound,
    CommentNotFound,

    // Conflict errors
    Conflict,
    DuplicateReview,

    // Rate limiting
    RateLimited,

    // Database errors
    DatabaseError,
    ConnectionError,

    // External service errors
    MailError,

    // Internal errors
    InternalError,
    ConfigurationError,
    SerializationError,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Validation failed: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("User not found: {username}")]
    UserNotFound { username: String },

    #[error("Category not found: {slug}")]
    CategoryNotFound { slug: String },

    #[error("Genre not found: {slug}")]
    GenreNotFound { slug: String },

    #[error("Title not found: {id}")]
    TitleNotFound { id: i32 },

    #[error("Review not found: {id}")]
    ReviewNotFound { id: i32 },

    #[error("Comment not found: {id}")]
    CommentNotFound { id: i32 },

    // Conflict errors, reported as bad requests
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String, field: String },

    #[error("You have already reviewed title {title_id}")]
    DuplicateReview { title_id: i32 },

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimited,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Mail delivery error: {message}")]
    Mail { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a single-field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidInput(_) => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::UserNotFound { .. } => ErrorCode::UserNotFound,
            AppError::CategoryNotFound { .. } => ErrorCode::CategoryNotFound,
            AppError::GenreNotFound { .. } => ErrorCode::GenreNotFound,
            AppError::TitleNotFound { .. } => ErrorCode::TitleNotFound,
            AppError::ReviewNotFound { .. } => ErrorCode::ReviewNotFound,
            AppError::CommentNotFound { .. } => ErrorCode::CommentNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::DuplicateReview { .. } => ErrorCode::DuplicateReview,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Mail { .. } => ErrorCode::MailError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request, uniqueness conflicts included
            AppError::Validation { .. } |
            AppError::InvalidInput(_) |
            AppError::InvalidFormat { .. } |
            AppError::Duplicate { .. } |
            AppError::DuplicateReview { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } |
            AppError::InvalidToken |
            AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::UserNotFound { .. } |
            AppError::CategoryNotFound { .. } |
            AppError::GenreNotFound { .. } |
            AppError::TitleNotFound { .. } |
            AppError::ReviewNotFound { .. } |
            AppError::CommentNotFound { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::Mail { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Field-level messages, when the error concerns specific input fields
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation { message, field: Some(field) } => {
                Some(BTreeMap::from([(field.clone(), vec![message.clone()])]))
            }
            AppError::Duplicate { message, field } => {
                Some(BTreeMap::from([(field.clone(), vec![message.clone()])]))
            }
            AppError::DuplicateReview { .. } => Some(BTreeMap::from([(
                "title".to_string(),
                vec![self.to_string()],
            )])),
            AppError::InvalidInput(errors) => {
                let mut fields = FieldErrors::new();
                for (field, errs) in errors.field_errors() {
                    let messages = errs
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                        })
                        .collect();
                    fields.insert(field.to_string(), messages);
                }
                Some(fields)
            }
            _ => None,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                details: self.field_errors(),
                // Database internals stay in the log
                message: if matches!(self, AppError::Database(_)) {
                    "Database error".to_string()
                } else {
                    message
                },
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::TitleNotFound { id: 7 };
        assert_eq!(err.code(), ErrorCode::TitleNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::field("username", "Username 'me' is reserved");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());

        let fields = err.field_errors().unwrap();
        assert_eq!(fields["username"], vec!["Username 'me' is reserved".to_string()]);
    }

    #[test]
    fn test_conflicts_are_bad_requests() {
        let dup = AppError::Duplicate {
            message: "A user with that email already exists".into(),
            field: "email".into(),
        };
        assert_eq!(dup.status_code(), StatusCode::BAD_REQUEST);
        assert!(dup.field_errors().unwrap().contains_key("email"));

        let review = AppError::DuplicateReview { title_id: 3 };
        assert_eq!(review.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(review.code(), ErrorCode::DuplicateReview);
    }

    #[test]
    fn test_validator_errors_become_field_map() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("range");
        err.message = Some("Score must be between 1 and 10".into());
        errors.add("score", err);
        errors.add("text", ValidationError::new("length"));

        let fields = AppError::from(errors).field_errors().unwrap();
        assert_eq!(fields["score"], vec!["Score must be between 1 and 10".to_string()]);
        assert_eq!(fields["text"], vec!["Invalid value (length)".to_string()]);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
