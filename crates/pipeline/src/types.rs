//! Shapes shared across the five pipeline steps.

use std::collections::BTreeMap;

use paperloom_core::domain::Section;
use serde::{Deserialize, Serialize};

/// One normalized hit from a per-aspect summary search (step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryHit {
    pub paper_id: String,
    pub summary_text: String,
    pub source_sections: Vec<String>,
    pub topics: Vec<String>,
    pub score: f64,
    pub summary_type: String,
}

/// Step 1's output: per-aspect hits, keyed by lowercase aspect name.
/// Aspects with zero hits are omitted.
pub type RetrievalMap = BTreeMap<String, Vec<SummaryHit>>;

/// One aspect's cross-paper analysis (step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossPaperInsight {
    pub summaries: Vec<SummaryHit>,
    pub patterns: Vec<String>,
    pub trends: Vec<String>,
    pub common_approaches: Vec<String>,
    pub topic_clusters: BTreeMap<String, Vec<String>>,
    pub analysis_summary: String,
}

/// Step 2's output: only the five analyzed aspect types, keyed by lowercase
/// aspect name; aspects with fewer than two hits are omitted.
pub type InsightMap = BTreeMap<String, CrossPaperInsight>;

/// Step 3's output: `{paper_id -> {section -> ordered chunks}}`, at most two
/// paper entries.
pub type SourceTextMap = BTreeMap<String, BTreeMap<Section, Vec<String>>>;

/// Step 4's output: one structured context string per generated section.
pub type ContextMap = BTreeMap<Section, String>;

/// Step 5's output: one drafted (and possibly polished) section per
/// `Sections5` entry.
pub type GeneratedPaper = BTreeMap<Section, String>;
