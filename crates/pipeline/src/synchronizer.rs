//! §4.8 Topic-change Synchronizer: best-effort housekeeping that rewrites
//! stale `topics` display strings in the five `paper_*` section collections
//! after the taxonomy changes. Not on the critical path — generation reads
//! only from the current stable topic store, so a skipped or partial
//! synchronization never breaks a later run.
//!
//! Deliberately scoped to section collections only, matching the original
//! tool's behavior; the `summary_*` collections are left untouched (see
//! Open Question 3).

use std::collections::BTreeSet;
use std::sync::Arc;

use paperloom_core::domain::Section;
use paperloom_taxonomy::TopicStore;
use paperloom_vectorstore::VectorStore;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;

fn escape_surql_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn dedup_preserve_order(items: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Rewrites `topics` arrays across the five section collections to follow
/// taxonomy id changes.
pub struct TopicSynchronizer {
    store: Arc<dyn VectorStore>,
}

impl TopicSynchronizer {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// For each `old_id -> new_id` pair, resolve both to their current
    /// `"zh (en)"` display string via `topics` and rewrite every matching
    /// row. Pairs that no longer resolve (a stale id dropped from the
    /// store, or an id whose display string is unchanged) are skipped.
    /// Returns the number of rows rewritten.
    pub async fn synchronize(&self, topic_changes: &std::collections::BTreeMap<String, String>, topics: &TopicStore) -> Result<usize> {
        let mut total = 0;

        for (old_id, new_id) in topic_changes {
            let Some(old_topic) = topics.get(old_id) else {
                warn!(old_id, "synchronizer: old topic id no longer present, skipping");
                continue;
            };
            let Some(new_topic) = topics.get(new_id) else {
                warn!(new_id, "synchronizer: new topic id not found, skipping");
                continue;
            };

            let old_name = old_topic.display();
            let new_name = new_topic.display();
            if old_name == new_name {
                continue;
            }

            total += self.rewrite_occurrences(&old_name, &new_name).await?;
        }

        Ok(total)
    }

    async fn rewrite_occurrences(&self, old_name: &str, new_name: &str) -> Result<usize> {
        let mut count = 0;
        let expr = format!("topics CONTAINS \"{}\"", escape_surql_string(old_name));
        let fields = vec!["paper_id".to_string(), "section".to_string(), "topics".to_string()];

        for section in Section::ALL {
            let collection = section.collection_name();
            let rows = self.store.query(&collection, Some(&expr), &fields, 10_000).await?;

            for row in rows {
                let Some((paper_id, section_value, mut row_topics)) = extract_row(&row) else {
                    continue;
                };

                for topic in &mut row_topics {
                    if topic == old_name {
                        *topic = new_name.to_string();
                    }
                }
                dedup_preserve_order(&mut row_topics);

                let updated = self.store.update_topics(&collection, &paper_id, &section_value, &row_topics).await?;
                count += updated;
            }
        }

        info!(old_name, new_name, rows_updated = count, "synchronizer: topic rewritten");
        Ok(count)
    }
}

fn extract_row(row: &Value) -> Option<(String, String, Vec<String>)> {
    let paper_id = row.get("paper_id")?.as_str()?.to_string();
    let section = row.get("section")?.as_str()?.to_string();
    let topics = row
        .get("topics")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    Some((paper_id, section, topics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserve_order_keeps_first_occurrence() {
        let mut items = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        dedup_preserve_order(&mut items);
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn escape_handles_embedded_quotes() {
        assert_eq!(escape_surql_string(r#"a "b" c"#), r#"a \"b\" c"#);
    }

    #[test]
    fn extract_row_requires_all_three_fields() {
        let row = serde_json::json!({"paper_id": "p1", "section": "Method"});
        assert!(extract_row(&row).is_none());
    }
}
