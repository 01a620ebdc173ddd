//! Topic taxonomy engine: proposing topics for a paper abstract, and
//! stabilizing a generated topic list into a merged, renumbered one.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod error;
pub mod manager;
pub mod store;

pub use error::{Error, Result};
pub use manager::{
    apply_and_renumber, apply_propose_outcome, apply_suggestions, effective_id, parse_merge_suggestions,
    parse_propose_response, topic_list_text, MergeKind, MergeRoundOutcome, MergeSuggestion, ProposeOutcome, TopicManager,
    DEFAULT_MAX_HOPS,
};
pub use store::TopicStore;
