// src/error.rs

//! Unified error handling for the notifier.
//!
//! Pipeline components never let these escape a cycle: each boundary turns
//! them into a degraded value (empty source result, missing field, `false`
//! delivery) and logs them.

use std::fmt;

use thiserror::Error;

/// Result type alias for notifier operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A competition source could not be reached or refused our credentials
    #[error("Source {source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// Expected structure missing from scraped markup or API payload
    #[error("Parse mismatch in {context}: {message}")]
    ParseMismatch { context: String, message: String },

    /// Checkpoint could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Notification sink rejected a message
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a source-unavailable error.
    pub fn source_unavailable(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse-mismatch error with context.
    pub fn parse_mismatch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ParseMismatch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Create a delivery error.
    pub fn delivery(message: impl fmt::Display) -> Self {
        Self::Delivery(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
