//! Error types for vector-store operations.

use std::fmt;

use thiserror::Error;

/// Result type for vector-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur against the chunked vector store.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("collection not found: {name}")]
    CollectionNotFound { name: String },

    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    #[error("schema error: {reason}")]
    SchemaError { reason: String },

    #[error("core error: {0}")]
    Core(#[from] paperloom_core::Error),
}

impl Error {
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    pub fn serialization_error(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    pub fn schema_error(reason: impl Into<String>) -> Self {
        Self::SchemaError {
            reason: reason.into(),
        }
    }
}

/// Convert a SurrealDB error into a typed vector-store error, matching on
/// the message text since `surrealdb::Error` doesn't expose a stable
/// variant set across client/embedded backends.
pub fn from_surrealdb_error(err: impl fmt::Display) -> Error {
    let msg = err.to_string();
    if msg.contains("connection") || msg.contains("Connection") {
        Error::connection_failed(msg)
    } else if msg.contains("does not exist") || msg.contains("not found") {
        Error::collection_not_found(msg)
    } else {
        Error::query_failed(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_surrealdb_error_categorizes_connection_failures() {
        let err = from_surrealdb_error("connection refused");
        assert!(matches!(err, Error::ConnectionFailed { .. }));
    }

    #[test]
    fn from_surrealdb_error_categorizes_missing_collection() {
        let err = from_surrealdb_error("table papers does not exist");
        assert!(matches!(err, Error::CollectionNotFound { .. }));
    }

    #[test]
    fn from_surrealdb_error_defaults_to_query_failed() {
        let err = from_surrealdb_error("unexpected syntax");
        assert!(matches!(err, Error::QueryFailed { .. }));
    }
}
