//! Error types for section matching, summarization, and ingestion.

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

    /// Section mapping is missing at ingest/concluder time — fatal for
    /// that one paper, not for the run.
    #[error("section mapping missing for paper '{paper_id}'")]
    SectionMappingMissing { paper_id: String },

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

    pub fn section_mapping_missing(paper_id: impl Into<String>) -> Self {
        Self::SectionMappingMissing {
            paper_id: paper_id.into(),
        }
    }
}
