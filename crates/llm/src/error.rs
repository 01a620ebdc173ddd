//! Error types for LLM client operations.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the completion/embedding API.
#[derive(Error, Debug)]
pub enum Error {
    /// The request could not be sent or the connection dropped.
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// The API responded with a non-2xx status.
    #[error("API request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// The response body didn't match the expected shape.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// No API key was configured.
    #[error("no API key configured")]
    MissingApiKey,

    /// HTTP transport error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] paperloom_core::Error),
}

impl Error {
    /// Create a connection failed error.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a request failed error.
    pub fn request_failed(status: u16, body: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Whether a caller could reasonably retry this failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Http(_))
    }
}
