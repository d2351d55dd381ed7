//! Error types for export-courier
//!
//! This module provides the error taxonomy for the service:
//! - Startup errors (configuration, listener binding, certificate loading)
//! - Request-level errors raised before an export is delegated (malformed bodies)
//! - HTTP status code mapping for the API surface
//! - Structured error responses with machine-readable error codes
//!
//! Generation failures reported by the export pipeline are *not* errors in this
//! sense; they travel as [`crate::pipeline::ExportOutcome::Failed`] and are turned
//! into the export response envelope by the lifecycle controller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for export-courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for export-courier
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "server.timeout")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binding a listener failed for a reason other than a recoverable port conflict
    #[error("failed to bind port {port}: {source}")]
    Bind {
        /// The port that could not be bound
        port: u16,
        /// The underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Every port in the search window was already in use
    #[error("no free port found after {attempts} attempts starting at {start}")]
    PortSearchExhausted {
        /// The preferred port the search started from
        start: u16,
        /// Number of ports tried
        attempts: u16,
    },

    /// Certificate material for the encrypted listener could not be loaded
    #[error("failed to load certificate material from {path}: {source}")]
    Certificate {
        /// The certificate directory that was read
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The export request could not be normalized before delegation
    #[error("invalid export request: {0}")]
    InvalidRequest(String),

    /// The request body was rejected by an extractor (wrong content type, too large, ...)
    #[error("request rejected: {message}")]
    PayloadRejected {
        /// HTTP status chosen by the extractor
        status: u16,
        /// Rejection message
        message: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A listener stopped with an error while serving
    #[error("server error: {0}")]
    Server(String),
}

/// API error response format
///
/// Returned for request-level errors that happen before an export is delegated,
/// such as a malformed body. Export outcomes use their own envelope.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_request",
///     "message": "invalid export request: missing field `fileFormat`"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidRequest(_) => 400,

            // Whatever the extractor decided (413, 415, 422, ...)
            Error::PayloadRejected { status, .. } => *status,

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::Bind { .. } => 500,
            Error::PortSearchExhausted { .. } => 500,
            Error::Certificate { .. } => 500,
            Error::Serialization(_) => 500,
            Error::Server(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Bind { .. } => "bind_failed",
            Error::PortSearchExhausted { .. } => "port_search_exhausted",
            Error::Certificate { .. } => "certificate_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::PayloadRejected { .. } => "payload_rejected",
            Error::Serialization(_) => "serialization_error",
            Error::Server(_) => "server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let mut api_error = ApiError::new(error.error_code(), error.to_string());

        api_error.error.details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Bind { port, .. } => Some(serde_json::json!({
                "port": port,
            })),
            Error::PortSearchExhausted { start, attempts } => Some(serde_json::json!({
                "start_port": start,
                "attempts": attempts,
            })),
            Error::Certificate { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            Error::PayloadRejected { status, .. } => Some(serde_json::json!({
                "status": status,
            })),
            _ => None,
        };

        api_error
    }
}
