//! Error handling for dev-serve.
//!
//! This module provides a hierarchical error type system using `thiserror` for
//! structured error handling with actionable messages.
//!
//! # Architecture
//!
//! - **Top-level errors** (`ServeError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`) provide detailed context
//! - **Error conversion** is automatic via `#[from]` attributes
//!
//! Per-request failures never surface here: the HTTP handlers contain them and
//! degrade to a 500 response. Everything that does reach `ServeError` is a
//! startup or process-level fault, rendered through miette at the binary
//! boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the server binary.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Configuration-related errors (conflicting options, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Listener setup and serving errors
    #[error("Server error: {0}")]
    Server(String),

    /// TLS material loading or certificate generation errors
    #[error("TLS error: {0}")]
    Tls(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
///
/// These occur while turning CLI/env input into a [`crate::config::ServerConfig`].
/// Each variant names the offending field and gives a hint for fixing it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Mutually exclusive options were specified
    #[error("Conflicting options: {0}\n\nHint: These options cannot be used together")]
    ConflictingOptions(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// CERT/KEY did not resolve to valid PEM data
    #[error("{field} must either contain the path to a PEM file or the text of a valid PEM file")]
    InvalidPem {
        /// Which option carried the bad value
        field: String,
    },
}

/// Result type alias using `ServeError` as the default error type.
pub type Result<T, E = ServeError> = std::result::Result<T, E>;

/// Convert a ServeError to a miette Report for terminal rendering.
pub fn to_miette(err: ServeError) -> miette::Report {
    match err {
        ServeError::Config(e) => miette::miette!("Configuration error: {}", e),
        ServeError::Tls(msg) => miette::miette!(
            "TLS error: {}\n\nHint: supply CERT and KEY, or set HTTP=1 for a plain HTTP server",
            msg
        ),
        _ => miette::miette!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_options_message() {
        let err = ConfigError::ConflictingOptions("HTTP and CERT".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Conflicting options: HTTP and CERT"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            field: "port".to_string(),
            value: "99999".to_string(),
            hint: "Ports must be in the range 0-65535".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'port'"));
        assert!(msg.contains("99999"));
    }

    #[test]
    fn test_serve_error_from_config_error() {
        let config_err = ConfigError::MissingField {
            field: "KEY".to_string(),
            hint: "If using CERT you must also supply KEY".to_string(),
        };
        let err: ServeError = config_err.into();
        assert!(matches!(err, ServeError::Config(_)));
    }

    #[test]
    fn test_invalid_pem_names_field() {
        let err = ConfigError::InvalidPem {
            field: "CERT".to_string(),
        };
        assert!(err.to_string().starts_with("CERT must either contain"));
    }
}
