//! Error types for tokenflight
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for tokenflight
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("No token found, the user may not be authenticated")]
    NoCredential,

    /// Shared by every request that waited on the same failed refresh.
    #[error("Token refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: Arc<Error>,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Wrap a refresh failure so it can be handed to several waiters
    pub fn refresh_failed(source: Arc<Error>) -> Self {
        Self::RefreshFailed { source }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the server rejected the request's credentials (401/403)
    pub fn is_auth_rejection(&self) -> bool {
        match self {
            Error::HttpStatus { status, .. } => is_auth_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code means the credentials were rejected
pub fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Result type alias for tokenflight
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("origin");
        assert_eq!(err.to_string(), "Missing required config field: origin");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::refresh_failed(Arc::new(Error::http_status(500, "boom")));
        assert_eq!(err.to_string(), "Token refresh failed: HTTP 500: boom");
    }

    #[test_case(401, true ; "unauthorized")]
    #[test_case(403, true ; "forbidden")]
    #[test_case(400, false ; "bad request")]
    #[test_case(404, false ; "not found")]
    #[test_case(500, false ; "server error")]
    fn test_is_auth_rejection(status: u16, expected: bool) {
        assert_eq!(Error::http_status(status, "").is_auth_rejection(), expected);
    }

    #[test]
    fn test_refresh_failure_is_not_auth_rejection() {
        let err = Error::refresh_failed(Arc::new(Error::http_status(401, "")));
        assert!(!err.is_auth_rejection());
        assert!(!Error::NoCredential.is_auth_rejection());
    }

    #[test]
    fn test_refresh_failed_exposes_source() {
        use std::error::Error as _;

        let err = Error::refresh_failed(Arc::new(Error::http_status(500, "down")));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "HTTP 500: down");
    }

    #[test]
    fn test_status() {
        assert_eq!(Error::http_status(503, "").status(), Some(503));
        assert_eq!(Error::NoCredential.status(), None);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
