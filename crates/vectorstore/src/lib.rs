//! Chunked vector store abstraction for the paper knowledge pipeline.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{DistanceMetric, FieldDef, FieldKind, IndexParams, SearchHit, SurrealVectorStore, VectorStore};
