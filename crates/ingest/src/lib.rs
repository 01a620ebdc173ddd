//! Paper ingestion pipeline: section matching, per-aspect summarization,
//! per-paper topic labeling, and chunked vector-store ingestion.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod chunker;
pub mod concluder;
pub mod error;
pub mod labeler;
pub mod paper_walk;
pub mod section_matcher;
pub mod source_ingestor;
pub mod summary_ingestor;

pub use chunker::{chunk_sentences, chunk_text, split_sentences};
pub use concluder::{load_canonical_sections, SectionConcluder, SummaryManifest};
pub use error::{Error, Result};
pub use labeler::{parse_topic_ids, render_topic_list, PaperLabeler};
pub use paper_walk::{discover_papers, raw_section_titles, PaperRef};
pub use section_matcher::{parse_match_response, SectionMatcher};
pub use source_ingestor::{resolve_topic_names, SourceIngestor};
pub use summary_ingestor::SummaryIngestor;
