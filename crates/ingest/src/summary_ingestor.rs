//! §4.5 Summary Ingestor: embed each completed aspect summary and push it
//! into that aspect's `summary_*` collection.

use std::path::Path;
use std::sync::Arc;

use paperloom_core::domain::Aspect;
use paperloom_llm::LlmClient;
use paperloom_vectorstore::{DistanceMetric, FieldDef, FieldKind, IndexParams, VectorStore};
use serde_json::json;
use tracing::{info, warn};

use crate::concluder::SummaryManifest;
use crate::error::{Error, Result};

const SUMMARY_MAX_LEN: usize = 8192;

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

fn collection_fields(embedding_dim: usize) -> Vec<FieldDef> {
    vec![
        FieldDef::new("paper_id", FieldKind::Text),
        FieldDef::new("summary_text", FieldKind::Text),
        FieldDef::new("source_sections", FieldKind::Array),
        FieldDef::new("topics", FieldKind::Array),
        FieldDef::new("embedding", FieldKind::Vector(embedding_dim)),
    ]
}

/// Embeds and inserts per-aspect summaries into the ten `summary_*`
/// collections.
pub struct SummaryIngestor {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    embedding_dim: usize,
}

impl SummaryIngestor {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, llm: Arc<dyn LlmClient>, embedding_dim: usize) -> Self {
        Self {
            store,
            llm,
            embedding_dim,
        }
    }

    /// Create (or reopen) and index all ten `summary_*` collections.
    pub async fn ensure_collections(&self) -> Result<()> {
        let fields = collection_fields(self.embedding_dim);
        for aspect in Aspect::ALL {
            let name = aspect.collection_name();
            self.store
                .create_collection(&name, &fields, &format!("Collection for {} summaries", aspect.as_str()))
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

    /// Ingest one paper's completed aspect summaries, reading
    /// `{aspect}.txt` files out of `conclude_dir`. Returns the number of
    /// aspects successfully inserted.
    pub async fn ingest_paper(
        &self,
        paper_id: &str,
        manifest: &SummaryManifest,
        conclude_dir: &Path,
        topic_names: &[String],
    ) -> Result<usize> {
        let mut inserted_count = 0;

        for aspect_name in &manifest.completed_aspects {
            let Some(aspect) = Aspect::from_str_opt(aspect_name) else {
                warn!(paper_id, aspect_name, "unknown aspect name in summary manifest, skipping");
                continue;
            };

            let path = conclude_dir.join(format!("{aspect_name}.txt"));
            let content = std::fs::read_to_string(&path).map_err(|e| Error::read_failed(path.display().to_string(), e))?;
            let summary_text = truncate(content.trim(), SUMMARY_MAX_LEN);

            let embeddings = self.llm.embed_batch(std::slice::from_ref(&summary_text)).await?;
            let Some(embedding) = embeddings.into_iter().next() else {
                warn!(paper_id, aspect_name, "no embedding produced, skipping aspect");
                continue;
            };

            let source_sections: Vec<&str> = aspect.required_sections().iter().map(|s| s.as_str()).collect();

            let row = json!({
                "paper_id": paper_id,
                "summary_text": summary_text,
                "source_sections": source_sections,
                "topics": topic_names,
                "embedding": embedding,
            });

            let n = self.store.insert(&aspect.collection_name(), vec![row]).await?;
            if n > 0 {
                inserted_count += 1;
                info!(paper_id, aspect = aspect_name, "summary ingested");
            }
        }

        Ok(inserted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "a".repeat(10);
        assert_eq!(truncate(&text, 5).len(), 5);
    }
}
