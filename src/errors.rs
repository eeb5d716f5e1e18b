//! # Application Error Types
//!
//! This module defines common error types used throughout the blight-scan service.
//! Per-request pipeline failures live in [`crate::prediction_errors`]; this module
//! covers startup and hosting concerns.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Model serving errors surfaced during startup
    Model(String),
    /// Network/communication errors
    Network(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Model(msg) => write!(f, "[MODEL] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::prediction_errors::PredictionError> for AppError {
    fn from(err: crate::prediction_errors::PredictionError) -> Self {
        AppError::Model(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the service
pub mod error_logging {
    use tracing::{error, warn};

    /// Log payload decode failures with upload context
    pub fn log_decode_error(error: &impl std::fmt::Display, payload_size: usize) {
        warn!(
            error = %error,
            payload_size_bytes = %payload_size,
            "Image payload could not be decoded"
        );
    }

    /// Log classification failures with timing context
    pub fn log_classification_error(
        error: &impl std::fmt::Display,
        operation: &str,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Classification failed"
        );
    }

    /// Log HTTP request handling errors with connection context
    pub fn log_request_error(
        error: &impl std::fmt::Display,
        method: &str,
        path: &str,
        status: Option<u16>,
    ) {
        error!(
            error = %error,
            method = %method,
            path = %path,
            status = ?status,
            "Request handling failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(
        error: &impl std::fmt::Display,
        config_key: &str,
        operation: &str,
    ) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
