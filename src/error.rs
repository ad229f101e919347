// src/error.rs

//! Unified error handling for the refresh job.
//!
//! Per-item verification outcomes are not errors; they are carried as
//! [`RejectionReason`](crate::models::RejectionReason) values. `AppError` is
//! reserved for provider-level and run-level failures.

use std::fmt;

use thiserror::Error;

/// Result type alias for refresh operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response arrived
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

    /// A page answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// A request exceeded its timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// A provider's listing could not be fetched or parsed
    #[error("Provider '{provider}' failed: {message}")]
    ProviderFetch { provider: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Writing or reading persisted state failed
    #[error("Storage error for {path}: {message}")]
    Storage { path: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a provider fetch error.
    pub fn provider(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ProviderFetch {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage error with the path involved.
    pub fn storage(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Map a reqwest error to a typed fetch error for the given URL.
    pub fn from_request(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
            };
        }
        if let Some(status) = error.status() {
            return Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        Self::Http(error)
    }
}
