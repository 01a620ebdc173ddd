//! Error types for the retrieval-and-composition pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read '{path}'")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}'")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error reading/writing '{path}'")]
    JsonFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no summary retrieval hits for any aspect, cannot proceed")]
    NoRetrievalHits,

    #[error("core error: {0}")]
    Core(#[from] paperloom_core::Error),

    #[error("llm error: {0}")]
    Llm(#[from] paperloom_llm::Error),

    #[error("vector store error: {0}")]
    VectorStore(#[from] paperloom_vectorstore::Error),

    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] paperloom_taxonomy::Error),
}

impl Error {
    pub fn read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn json_failed(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonFailed {
            path: path.into(),
            source,
        }
    }
}
