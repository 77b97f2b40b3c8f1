//! Error handling module
//!
//! Provides unified error types and handling for the entire toolkit.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for toolkit operations
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a configuration error
pub fn configuration_error(msg: impl Into<String>) -> AppError {
    AppError::Configuration(msg.into())
}

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create a conflict error
pub fn conflict_error(msg: impl Into<String>) -> AppError {
    AppError::Conflict(msg.into())
}
