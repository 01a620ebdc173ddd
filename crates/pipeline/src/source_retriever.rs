//! Step 3 — Source Text Selection: pick at most two papers (one
//! methodology-best, one experiment-best) and fetch their full canonical
//! section content, chunk-ordered.

use std::collections::BTreeMap;
use std::sync::Arc;

use paperloom_core::domain::Section;
use paperloom_vectorstore::VectorStore;
use tracing::info;

use crate::error::Result;
use crate::types::{RetrievalMap, SourceTextMap, SummaryHit};

const EXPERIMENT_ASPECTS: [&str; 4] = ["expedesign", "baseline", "metric", "resultanalysis"];

fn best_hit<'a>(hits: impl Iterator<Item = &'a SummaryHit>) -> Option<&'a SummaryHit> {
    hits.min_by(|a, b| a.score.total_cmp(&b.score))
}

/// Parse the integer chunk index after the last `_` in a chunked
/// `paper_id`; defaults to 0 if the suffix isn't a valid integer.
#[must_use]
pub fn extract_chunk_number(paper_id: &str) -> u64 {
    paper_id.rsplit('_').next().and_then(|suffix| suffix.parse::<u64>().ok()).unwrap_or(0)
}

fn like_filters(id: &str) -> [String; 3] {
    [
        format!("string::contains(paper_id, \"/{id}_\")"),
        format!("string::starts_with(paper_id, \"{id}\")"),
        format!("string::contains(paper_id, \"{id}\")"),
    ]
}

/// Fetches and orders the full chunk list for one paper's section,
/// trying three progressively looser `paper_id` filters.
pub struct SourceTextRetriever {
    store: Arc<dyn VectorStore>,
}

impl SourceTextRetriever {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    async fn fetch_section_chunks(&self, section: Section, paper_id: &str) -> Result<Vec<String>> {
        let collection = section.collection_name();
        let fields = vec!["paper_id".to_string(), "text".to_string()];

        for filter in like_filters(paper_id) {
            let rows = self.store.query(&collection, Some(&filter), &fields, 10_000).await?;
            if rows.is_empty() {
                continue;
            }

            let mut ordered: Vec<(u64, String)> = rows
                .iter()
                .filter_map(|row| {
                    let chunk_id = row.get("paper_id")?.as_str()?;
                    let text = row.get("text")?.as_str()?.to_string();
                    Some((extract_chunk_number(chunk_id), text))
                })
                .collect();
            ordered.sort_by_key(|(n, _)| *n);

            return Ok(ordered.into_iter().map(|(_, text)| text).collect());
        }

        Ok(Vec::new())
    }

    /// Select at most two papers: the best `methodology` hit (Method
    /// section) and the best hit across the four experiment aspects
    /// (Experiments section), merging under one entry if they coincide.
    pub async fn select(&self, retrieval: &RetrievalMap) -> Result<SourceTextMap> {
        let mut result: SourceTextMap = BTreeMap::new();

        if let Some(hit) = retrieval.get("methodology").and_then(|hits| best_hit(hits.iter())) {
            let chunks = self.fetch_section_chunks(Section::Method, &hit.paper_id).await?;
            if !chunks.is_empty() {
                info!(paper_id = hit.paper_id, chunks = chunks.len(), "method source text selected");
                result.entry(hit.paper_id.clone()).or_default().insert(Section::Method, chunks);
            }
        }

        let experiment_hits = EXPERIMENT_ASPECTS.iter().filter_map(|aspect| retrieval.get(*aspect)).flatten();
        if let Some(hit) = best_hit(experiment_hits) {
            let chunks = self.fetch_section_chunks(Section::Experiments, &hit.paper_id).await?;
            if !chunks.is_empty() {
                info!(paper_id = hit.paper_id, chunks = chunks.len(), "experiment source text selected");
                result.entry(hit.paper_id.clone()).or_default().insert(Section::Experiments, chunks);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_chunk_number() {
        assert_eq!(extract_chunk_number("ICML/2024/paper_7"), 7);
        assert_eq!(extract_chunk_number("paper_without_number_x"), 0);
    }

    #[test]
    fn best_hit_picks_smallest_score() {
        let hits = vec![
            SummaryHit {
                paper_id: "a".to_string(),
                summary_text: String::new(),
                source_sections: vec![],
                topics: vec![],
                score: 0.9,
                summary_type: "methodology".to_string(),
            },
            SummaryHit {
                paper_id: "b".to_string(),
                summary_text: String::new(),
                source_sections: vec![],
                topics: vec![],
                score: 0.2,
                summary_type: "methodology".to_string(),
            },
        ];
        let best = best_hit(hits.iter()).expect("best hit");
        assert_eq!(best.paper_id, "b");
    }
}
