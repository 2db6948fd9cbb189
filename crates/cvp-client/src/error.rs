//! CVP client errors

use thiserror::Error;

/// Errors that can occur when interacting with the CVP API
#[derive(Debug, Error)]
pub enum CvpError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CVP returned an error, either as a non-2xx status or an error envelope
    #[error("CVP API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or expired token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local I/O error (image upload)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
