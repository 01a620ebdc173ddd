//! `TopicStore`: JSON-backed load/save for one of the three staged stores
//! (`gen_topic`, `middle_topic`, `topic`), all identical in shape.

use std::collections::BTreeMap;
use std::path::Path;

use paperloom_core::domain::Topic;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A snapshot of topics keyed by decimal-string id, as persisted to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicStore {
    pub topics: BTreeMap<String, Topic>,
}

impl TopicStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file. A missing file is treated as empty,
    /// matching a taxonomy that hasn't run yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::store_read_failed(path.display().to_string(), e))?;
        serde_json::from_str(&content).map_err(|source| Error::StoreParseFailed { source })
    }

    /// Write the store back to disk as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::store_write_failed(path.display().to_string(), e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|source| Error::StoreParseFailed { source })?;
        std::fs::write(path, content)
            .map_err(|e| Error::store_write_failed(path.display().to_string(), e))
    }

    /// The highest numeric id present, or 0 if the store is empty or no id
    /// parses as a decimal integer.
    #[must_use]
    pub fn max_numeric_id(&self) -> u64 {
        self.topics
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id)
    }

    pub fn insert(&mut self, topic: Topic) {
        self.topics.insert(topic.id.clone(), topic);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_numeric_id_ignores_unparseable_keys() {
        let mut store = TopicStore::new();
        store.insert(Topic::new("3", "a", "A"));
        store.insert(Topic::new("11", "b", "B"));
        assert_eq!(store.max_numeric_id(), 11);
    }

    #[test]
    fn max_numeric_id_of_empty_store_is_zero() {
        assert_eq!(TopicStore::new().max_numeric_id(), 0);
    }

    #[test]
    fn load_of_missing_path_yields_empty_store() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let store = TopicStore::load("/nonexistent/path/topic.json")?;
        assert!(store.is_empty());
        Ok(())
    }
}
