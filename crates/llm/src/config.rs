//! Client configuration for the completion and embedding endpoints.

use std::time::Duration;

/// Configuration for [`crate::client::LlmHttpClient`].
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub api_key: Option<String>,
    pub completion_url: String,
    pub embedding_url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub embedding_timeout: Duration,
    /// Texts per embedding request, matching the upstream API's batch limit.
    pub embedding_batch_size: usize,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_url: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            embedding_url: "https://api.siliconflow.cn/v1/embeddings".to_string(),
            model: "deepseek-ai/DeepSeek-V3".to_string(),
            embedding_model: "BAAI/bge-large-zh-v1.5".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(60),
            embedding_timeout: Duration::from_secs(30),
            embedding_batch_size: 32,
        }
    }
}

impl From<&paperloom_core::config::LlmConfig> for LlmClientConfig {
    fn from(cfg: &paperloom_core::config::LlmConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            completion_url: cfg.completion_url.clone(),
            embedding_url: cfg.embedding_url.clone(),
            model: cfg.model.clone(),
            embedding_model: cfg.embedding_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            timeout: cfg.timeout,
            embedding_timeout: cfg.embedding_timeout,
            embedding_batch_size: 32,
        }
    }
}
