//! Retrieval-and-composition pipeline: five sequential steps that turn a
//! user requirement into a drafted, polished paper, plus the topic-change
//! synchronizer that keeps ingested `topics` tags current after the
//! taxonomy changes (§4.6, §4.8).

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod analyzer;
pub mod context_builder;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod retriever;
pub mod source_retriever;
pub mod synchronizer;
pub mod types;

pub use analyzer::CrossPaperAnalyzer;
pub use context_builder::ContextBuilder;
pub use error::{Error, Result};
pub use generator::{GeneratorTemplates, PaperGenerator};
pub use pipeline::{render_markdown, GenerationPipeline, RunDir};
pub use retriever::{standardize_requirement, SummaryRetriever};
pub use source_retriever::{extract_chunk_number, SourceTextRetriever};
pub use synchronizer::TopicSynchronizer;
pub use types::{ContextMap, CrossPaperInsight, GeneratedPaper, InsightMap, RetrievalMap, SourceTextMap, SummaryHit};
