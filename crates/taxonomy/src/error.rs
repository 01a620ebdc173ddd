//! Error types for the topic taxonomy engine.

use thiserror::Error;

/// Result type for taxonomy operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read topic store '{path}'")]
    StoreReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write topic store '{path}'")]
    StoreWriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("topic store JSON error")]
    StoreParseFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown topic id: {id}")]
    UnknownTopic { id: String },

    #[error("core error: {0}")]
    Core(#[from] paperloom_core::Error),

    #[error("llm error: {0}")]
    Llm(#[from] paperloom_llm::Error),
}

impl Error {
    pub fn store_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StoreReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn store_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::StoreWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_topic(id: impl Into<String>) -> Self {
        Self::UnknownTopic { id: id.into() }
    }
}
