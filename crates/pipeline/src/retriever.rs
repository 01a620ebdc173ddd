//! Step 1 — Summary Retrieval: canonicalize the user requirement, then fan
//! out one top-k search per aspect's `summary_*` collection, bounded to a
//! fixed worker pool.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use paperloom_core::domain::Aspect;
use paperloom_llm::LlmClient;
use paperloom_vectorstore::VectorStore;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::{RetrievalMap, SummaryHit};

const USER_NEED_PROMPT_PREFIX: &str =
    "Canonicalize the following research requirement into a structured description:\n\n";

/// Canonicalize `requirement` via a separate "user need" LLM call; falls
/// back to the raw input if the call produces no response.
pub async fn standardize_requirement(llm: &dyn LlmClient, requirement: &str) -> Result<String> {
    let prompt = format!("{USER_NEED_PROMPT_PREFIX}{requirement}");
    match llm.complete(&prompt).await? {
        Some(standardized) if !standardized.trim().is_empty() => Ok(standardized),
        _ => {
            warn!("user-need canonicalization produced no output, using raw requirement");
            Ok(requirement.to_string())
        }
    }
}

fn hit_from_value(value: &serde_json::Map<String, serde_json::Value>, score: f64, summary_type: &str) -> Option<SummaryHit> {
    let paper_id = value.get("paper_id")?.as_str()?.to_string();
    let summary_text = value.get("summary_text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let source_sections = value
        .get("source_sections")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let topics = value
        .get("topics")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    Some(SummaryHit {
        paper_id,
        summary_text,
        source_sections,
        topics,
        score,
        summary_type: summary_type.to_string(),
    })
}

/// Fans out one search per aspect collection, bounded to `fanout_workers`
/// concurrent in-flight searches.
pub struct SummaryRetriever {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    top_k_per_aspect: usize,
    fanout_workers: usize,
}

impl SummaryRetriever {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LlmClient>, top_k_per_aspect: usize, fanout_workers: usize) -> Self {
        Self {
            store,
            llm,
            top_k_per_aspect,
            fanout_workers,
        }
    }

    /// Embed `requirement` once, then search all ten aspect collections
    /// concurrently (bounded to `fanout_workers` at a time). Aspects with
    /// zero hits are omitted from the result map.
    pub async fn retrieve(&self, requirement: &str) -> Result<RetrievalMap> {
        let embeddings = self.llm.embed_batch(std::slice::from_ref(&requirement.to_string())).await?;
        let Some(vector) = embeddings.into_iter().next() else {
            warn!("requirement embedding failed, retrieval map is empty");
            return Ok(RetrievalMap::new());
        };

        let fields = vec![
            "paper_id".to_string(),
            "summary_text".to_string(),
            "source_sections".to_string(),
            "topics".to_string(),
        ];

        let results = stream::iter(Aspect::ALL)
            .map(|aspect| {
                let store = Arc::clone(&self.store);
                let vector = vector.clone();
                let fields = fields.clone();
                let top_k = self.top_k_per_aspect;
                async move {
                    let collection = aspect.collection_name();
                    let hits = store.search(&collection, &vector, None, &fields, top_k).await;
                    (aspect, hits)
                }
            })
            .buffer_unordered(self.fanout_workers)
            .collect::<Vec<_>>()
            .await;

        let mut map = RetrievalMap::new();
        for (aspect, hits) in results {
            let hits = match hits {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(aspect = aspect.as_str(), error = %e, "aspect search failed, treated as zero hits");
                    continue;
                }
            };
            if hits.is_empty() {
                continue;
            }

            let summary_type = aspect.lower_key();
            let normalized: Vec<SummaryHit> = hits
                .iter()
                .filter_map(|hit| hit_from_value(&hit.fields, hit.score, &summary_type))
                .collect();
            if normalized.is_empty() {
                continue;
            }

            info!(aspect = aspect.as_str(), hits = normalized.len(), "summary retrieval");
            map.insert(summary_type, normalized);
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_from_value_parses_required_fields() {
        let value = json!({
            "paper_id": "p1",
            "summary_text": "a summary",
            "source_sections": ["Method"],
            "topics": ["Diffusion Models (扩散模型)"],
        });
        let obj = value.as_object().cloned().unwrap_or_default();
        let hit = hit_from_value(&obj, 1.5, "methodology").expect("hit");
        assert_eq!(hit.paper_id, "p1");
        assert_eq!(hit.source_sections, vec!["Method".to_string()]);
        assert_eq!(hit.summary_type, "methodology");
    }

    #[test]
    fn hit_from_value_requires_paper_id() {
        let value = json!({"summary_text": "x"});
        let obj = value.as_object().cloned().unwrap_or_default();
        assert!(hit_from_value(&obj, 1.0, "methodology").is_none());
    }
}
