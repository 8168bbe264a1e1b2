// src/error.rs

//! Unified error handling for the SCMS client.

use std::fmt;

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Unified client error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server replied with a non-success status code.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        /// Parsed response body when the server sent JSON, raw text otherwise.
        payload: Option<serde_json::Value>,
    },

    /// Request never produced a response (DNS, connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session is active for an operation that needs one.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
}

impl ApiError {
    /// Create an HTTP error from a status code and extracted message.
    pub fn http(status: u16, message: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            payload,
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

    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl fmt::Display) -> Self {
        Self::Unauthenticated(message.to_string())
    }

    /// Status code when this error is an HTTP rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the credential behind this error.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
