//! §4.4 Source Ingestor: chunk each `Sections5` section's raw text and push
//! it, embedded and topic-tagged, into five per-section collections.

use std::collections::BTreeMap;
use std::sync::Arc;

use paperloom_core::config::ChunkingConfig;
use paperloom_core::domain::Section;
use paperloom_llm::LlmClient;
use paperloom_taxonomy::TopicStore;
use paperloom_vectorstore::{DistanceMetric, FieldDef, FieldKind, IndexParams, VectorStore};
use serde_json::json;
use tracing::{info, warn};

use crate::chunker::chunk_text;
use crate::error::Result;

const TEXT_MAX_LEN: usize = 8000;

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

/// Resolve labeler topic ids to `"zh (en)"` display strings, dropping ids
/// the stable store no longer knows about.
#[must_use]
pub fn resolve_topic_names(topic_ids: &[String], topics: &TopicStore) -> Vec<String> {
    topic_ids
        .iter()
        .filter_map(|id| match topics.get(id) {
            Some(topic) => Some(topic.display()),
            None => {
                warn!(topic_id = id, "labeled topic id not found in stable store");
                None
            }
        })
        .collect()
}

fn collection_fields(embedding_dim: usize) -> Vec<FieldDef> {
    vec![
        FieldDef::new("paper_id", FieldKind::Text),
        FieldDef::new("section", FieldKind::Text),
        FieldDef::new("text", FieldKind::Text),
        FieldDef::new("topics", FieldKind::Array),
        FieldDef::new("embedding", FieldKind::Vector(embedding_dim)),
    ]
}

/// Chunks and embeds per-section paper text into the five `paper_*`
/// collections.
pub struct SourceIngestor {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    embedding_dim: usize,
}

impl SourceIngestor {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LlmClient>, embedding_dim: usize) -> Self {
        Self {
            store,
            llm,
            embedding_dim,
        }
    }

    /// Create (or reopen) and index all five `paper_*` collections.
    pub async fn ensure_collections(&self) -> Result<()> {
        let fields = collection_fields(self.embedding_dim);
        for section in Section::ALL {
            let name = section.collection_name();
            self.store
                .create_collection(&name, &fields, &format!("Collection for paper {}", section.as_str()))
                .await?;
            self.store
                .ensure_index(
                    &name,
                    "embedding",
                    IndexParams {
                        dimension: self.embedding_dim,
                        distance: DistanceMetric::Euclidean,
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Chunk, embed, and insert every non-empty section for one paper.
    /// Returns the total number of chunks inserted across all sections.
    pub async fn ingest_paper(
        &self,
        paper_id: &str,
        sections: &BTreeMap<Section, String>,
        topic_names: &[String],
        chunking: &ChunkingConfig,
    ) -> Result<usize> {
        let mut total = 0;

        for (section, text) in sections {
            if text.trim().is_empty() {
                continue;
            }

            let chunks = chunk_text(text, chunking);
            if chunks.is_empty() {
                continue;
            }

            let embeddings = self.llm.embed_batch(&chunks).await?;

            let rows = chunks
                .iter()
                .zip(embeddings.iter())
                .enumerate()
                .map(|(i, (chunk, embedding))| {
                    json!({
                        "paper_id": format!("{paper_id}_{i}"),
                        "section": section.as_str(),
                        "text": truncate(chunk, TEXT_MAX_LEN),
                        "topics": topic_names,
                        "embedding": embedding,
                    })
                })
                .collect::<Vec<_>>();

            let inserted = self.store.insert(&section.collection_name(), rows).await?;
            info!(paper_id, section = section.as_str(), inserted, "source chunks ingested");
            total += inserted;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperloom_core::domain::Topic;

    #[test]
    fn resolve_topic_names_drops_unknown_ids() {
        let mut store = TopicStore::new();
        store.insert(Topic::new("1", "扩散模型", "Diffusion Models"));

        let names = resolve_topic_names(&["1".to_string(), "99".to_string()], &store);
        assert_eq!(names, vec!["扩散模型 (Diffusion Models)".to_string()]);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo world";
        let short = truncate(text, 3);
        assert_eq!(short.chars().count(), 3);
    }
}
