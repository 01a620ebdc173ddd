//! Process-wide configuration: filesystem layout, vector DB, and LLM settings.
//!
//! Mirrors the single `config.json` the original pipeline reads: one map
//! resolving every logical path plus the vector-DB connection and LLM
//! request defaults. Stages open this config fresh rather than sharing a
//! live handle (see §9 "Global state").

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Logical filesystem layout, resolved relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// `{component_extract}/{conf}/{year}/{paper_base}/{raw_title}.txt`
    #[serde(default = "default_component_extract")]
    pub component_extract: PathBuf,
    /// `{abstract_extract}/.../{paper_base}.txt`
    #[serde(default = "default_abstract_extract")]
    pub abstract_extract: PathBuf,
    /// `{label_dir}/.../{paper_base}.txt`
    #[serde(default = "default_label_dir")]
    pub label_dir: PathBuf,
    /// `{section_match}/{conf}/{year}/{paper_base}/section_mapping.json`
    #[serde(default = "default_section_match")]
    pub section_match: PathBuf,
    /// `{conclude_result}/{conf}/{year}/{paper_base}/{Aspect}.txt` + `summary.json`
    #[serde(default = "default_conclude_result")]
    pub conclude_result: PathBuf,
    /// Directory holding `topic.json`, `middle_topic.json`, `gen_topic.json`, `topic_ori.json`.
    #[serde(default = "default_topic_dir")]
    pub topic_dir: PathBuf,
    /// Directory holding `merge_opinion.json` and `output/{merge_ori,merge_LLM_result}`.
    #[serde(default = "default_merge_dir")]
    pub merge_dir: PathBuf,
    /// `{rag_data_base}/run_{YYYYMMDD_HHMMSS}/...`
    #[serde(default = "default_rag_data_base")]
    pub rag_data_base: PathBuf,
    /// `paperGen/generated_paper_{timestamp}.md`
    #[serde(default = "default_paper_gen_dir")]
    pub paper_gen_dir: PathBuf,
    /// Directory of prompt template files (section match, merge, aspect, paper, user-need).
    #[serde(default = "default_prompt_dir")]
    pub prompt_dir: PathBuf,
}

fn default_component_extract() -> PathBuf {
    PathBuf::from("data/component_extract")
}
fn default_abstract_extract() -> PathBuf {
    PathBuf::from("data/abstract_extract")
}
fn default_label_dir() -> PathBuf {
    PathBuf::from("data/labels")
}
fn default_section_match() -> PathBuf {
    PathBuf::from("data/section_match")
}
fn default_conclude_result() -> PathBuf {
    PathBuf::from("data/conclude_result")
}
fn default_topic_dir() -> PathBuf {
    PathBuf::from("config/topics")
}
fn default_merge_dir() -> PathBuf {
    PathBuf::from("config/topics")
}
fn default_rag_data_base() -> PathBuf {
    PathBuf::from("data/rag_runs")
}
fn default_paper_gen_dir() -> PathBuf {
    PathBuf::from("paperGen")
}
fn default_prompt_dir() -> PathBuf {
    PathBuf::from("config/prompts")
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            component_extract: default_component_extract(),
            abstract_extract: default_abstract_extract(),
            label_dir: default_label_dir(),
            section_match: default_section_match(),
            conclude_result: default_conclude_result(),
            topic_dir: default_topic_dir(),
            merge_dir: default_merge_dir(),
            rag_data_base: default_rag_data_base(),
            paper_gen_dir: default_paper_gen_dir(),
            prompt_dir: default_prompt_dir(),
        }
    }
}

/// Vector-database connection settings (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_alias")]
    pub alias: String,
    pub database: String,
    /// Embedding dimension `D`.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_alias() -> String {
    "default".to_string()
}
const fn default_embedding_dim() -> usize {
    1024
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            alias: default_alias(),
            database: "paperloom".to_string(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// LLM completion + embedding request settings (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_completion_url")]
    pub completion_url: String,
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub embedding_timeout: Duration,
}

fn default_completion_url() -> String {
    "https://api.siliconflow.cn/v1/chat/completions".to_string()
}
fn default_embedding_url() -> String {
    "https://api.siliconflow.cn/v1/embeddings".to_string()
}
fn default_model() -> String {
    "deepseek-ai/DeepSeek-V3".to_string()
}
fn default_embedding_model() -> String {
    "BAAI/bge-large-zh-v1.5".to_string()
}
const fn default_temperature() -> f32 {
    0.7
}
const fn default_max_tokens() -> u32 {
    4096
}
const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_url: default_completion_url(),
            embedding_url: default_embedding_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_timeout(),
            embedding_timeout: default_timeout(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Retrieval-pipeline tuning knobs (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k_per_aspect: usize,
    #[serde(default = "default_fanout_workers")]
    pub fanout_workers: usize,
}

const fn default_top_k() -> usize {
    5
}
const fn default_fanout_workers() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_per_aspect: default_top_k(),
            fanout_workers: default_fanout_workers(),
        }
    }
}

/// Chunking tuning knobs (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
}

const fn default_chunk_size() -> usize {
    500
}
const fn default_overlap_size() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory all `DataPaths` entries are resolved relative to.
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub data_paths: DataPaths,
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl AppConfig {
    /// Load configuration from a JSON, YAML, or TOML file (detected by extension).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::file_read_failed(path, e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(Error::yaml_parse_failed)
            }
            Some("toml") => toml::from_str(&content).map_err(Error::toml_parse_failed),
            _ => serde_json::from_str(&content).map_err(Error::json_parse_failed),
        }
    }

    /// Overlay API keys and hostnames from the environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay API keys and hostnames using a caller-supplied lookup, so the
    /// override logic can be tested without touching process environment.
    #[must_use]
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("PAPERLOOM_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(host) = lookup("PAPERLOOM_VECTOR_DB_HOST") {
            self.vector_db.host = host;
        }
        if let Some(root) = lookup("PAPERLOOM_ROOT") {
            self.root = PathBuf::from(root);
        }
        self
    }

    /// Resolve a `DataPaths` entry against `root`.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.top_k_per_aspect, 5);
        assert_eq!(config.retrieval.fanout_workers, 10);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap_size, 100);
    }

    #[test]
    fn resolve_joins_against_root() {
        let mut config = AppConfig::default();
        config.root = PathBuf::from("/data/paperloom");
        let resolved = config.resolve(&config.data_paths.topic_dir.clone());
        assert_eq!(resolved, PathBuf::from("/data/paperloom/config/topics"));
    }

    #[test]
    fn env_override_sets_api_key() {
        let config = AppConfig::default().with_env_lookup(|key| {
            (key == "PAPERLOOM_LLM_API_KEY").then(|| "test-key-123".to_string())
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("test-key-123"));
    }
}
