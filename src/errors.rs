//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the arbitration case checker, providing
//! error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from the scraper, storage and export layers
//! - **Output**: Structured error types with context and user-facing messages
//! - **Error Categories**: Validation, Source, Automation, Storage, Export,
//!   Configuration
//!
//! ## Key Features
//! - One error enum covering every operation boundary
//! - Automatic conversion from library error types
//! - User-friendly messages for the presentation layer
//! - Category labels for structured logging

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, CheckerError>;

/// Error types for the arbitration case checker
#[derive(Debug, Error)]
pub enum CheckerError {
    /// Bad user input (taxpayer ID shape, filter dates)
    #[error("Validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A bounded wait on the source page expired
    #[error("Source unavailable: timed out after {timeout_secs}s waiting for {stage}")]
    SourceUnavailable { stage: String, timeout_secs: u64 },

    /// WebDriver session or command fault reported by the automation endpoint
    #[error("WebDriver error during {operation}: {details}")]
    WebDriver { operation: String, details: String },

    /// HTTP-level failure talking to the WebDriver endpoint
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors (export files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckerError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CheckerError::Validation { .. } => "validation",
            CheckerError::SourceUnavailable { .. } => "source",
            CheckerError::WebDriver { .. } | CheckerError::Network(_) => "automation",
            CheckerError::Database(_) => "storage",
            CheckerError::Config { .. } | CheckerError::Toml(_) => "configuration",
            CheckerError::Json(_) | CheckerError::Io(_) => "export",
        }
    }

    /// Message suitable for the presentation layer. Validation and source
    /// faults come with guidance; the rest surface their detail as-is.
    pub fn user_message(&self) -> String {
        match self {
            CheckerError::Validation { reason, .. } => {
                format!("Ошибка: {reason}")
            }
            CheckerError::SourceUnavailable { .. } => {
                "Ошибка: сайт недоступен или отвечает слишком долго. Попробуйте позже.".to_string()
            }
            CheckerError::WebDriver { details, .. } => {
                format!("Ошибка WebDriver: {details}. Проверьте настройку chromedriver.")
            }
            CheckerError::Network(e) => {
                format!("Ошибка соединения с WebDriver: {e}. Запущен ли chromedriver?")
            }
            CheckerError::Database(e) => {
                format!("Ошибка базы данных: {e}. Проверьте настройки хранилища.")
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = CheckerError::Validation {
            field: "inn".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(err.category(), "validation");

        let err = CheckerError::SourceUnavailable {
            stage: "results container".to_string(),
            timeout_secs: 20,
        };
        assert_eq!(err.category(), "source");

        let err = CheckerError::WebDriver {
            operation: "click".to_string(),
            details: "stale element".to_string(),
        };
        assert_eq!(err.category(), "automation");
    }

    #[test]
    fn test_source_unavailable_user_message_is_generic() {
        let err = CheckerError::SourceUnavailable {
            stage: "results container".to_string(),
            timeout_secs: 20,
        };
        assert!(err.user_message().contains("недоступен"));
    }
}
