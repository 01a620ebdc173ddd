//! HTTP-backed LLM client: chat completions and batched embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmClientConfig;
use crate::error::{Error, Result};

/// A chat-completion and embedding backend.
///
/// Mirrors the original client's two entry points: a single free-text
/// completion, and a batched embedding call that never partially fails —
/// either the whole call succeeds or it doesn't return anything.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Ask for a single completion. Returns `None` if the service declined
    /// to answer (no API key, or a non-retryable failure) rather than
    /// propagating every transient error to the caller.
    async fn complete(&self, prompt: &str) -> Result<Option<String>>;

    /// Embed a batch of texts, internally chunked to the configured batch
    /// size. Returns one embedding per input text, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Default HTTP implementation, targeting an OpenAI-compatible
/// chat-completions + embeddings API.
#[derive(Debug, Clone)]
pub struct LlmHttpClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl LlmHttpClient {
    /// Build a client from config, failing if the underlying reqwest
    /// client cannot be constructed (e.g. TLS backend unavailable).
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::connection_failed(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn auth_header(&self) -> Result<String> {
        let key = self.config.api_key.as_ref().ok_or(Error::MissingApiKey)?;
        Ok(format!("Bearer {key}"))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOwned,
}

#[derive(Deserialize)]
struct ChatMessageOwned {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[async_trait]
impl LlmClient for LlmHttpClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let Ok(auth) = self.auth_header() else {
            warn!("no API key configured, skipping completion request");
            return Ok(None);
        };

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(prompt_len = prompt.len(), "sending completion request");

        let response = match self
            .http
            .post(&self.config.completion_url)
            .header("Authorization", auth)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "completion request failed");
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "completion API returned an error status");
            return Ok(None);
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "failed to parse completion response");
                return Ok(None);
            }
        };

        Ok(parsed.choices.into_iter().next().map(|c| c.message.content))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let auth = self.auth_header()?;
        let mut embeddings = Vec::with_capacity(texts.len());
        let total_batches = texts.chunks(self.config.embedding_batch_size).count();

        for (batch_num, batch) in texts.chunks(self.config.embedding_batch_size).enumerate() {
            info!(
                batch = batch_num.saturating_add(1),
                total_batches,
                size = batch.len(),
                "embedding batch"
            );

            let request = EmbeddingRequest {
                model: &self.config.embedding_model,
                input: batch,
            };

            let response = self
                .http
                .post(&self.config.embedding_url)
                .header("Authorization", auth.clone())
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::request_failed(status.as_u16(), body));
            }

            let parsed: EmbeddingResponse = response.json().await?;
            if parsed.data.len() != batch.len() {
                return Err(Error::invalid_response(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    parsed.data.len()
                )));
            }
            embeddings.extend(parsed.data.into_iter().map(|item| item.embedding));
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn config_for(server: &MockServer) -> LlmClientConfig {
        LlmClientConfig {
            api_key: Some("test-key".to_string()),
            completion_url: format!("{}/v1/chat/completions", server.uri()),
            embedding_url: format!("{}/v1/embeddings", server.uri()),
            embedding_batch_size: 2,
            ..LlmClientConfig::default()
        }
    }

    #[tokio::test]
    async fn complete_returns_none_without_api_key() -> TestResult {
        let client = LlmHttpClient::new(LlmClientConfig::default())?;
        let result = client.complete("hello").await?;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn complete_returns_message_content() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "generated text"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmHttpClient::new(config_for(&server))?;
        let result = client.complete("hello").await?;
        assert_eq!(result.as_deref(), Some("generated text"));
        Ok(())
    }

    #[tokio::test]
    async fn complete_returns_none_on_server_error() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LlmHttpClient::new(config_for(&server))?;
        let result = client.complete("hello").await?;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn embed_batch_splits_into_configured_batch_size() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2]}, {"embedding": [0.3, 0.4]}]
            })))
            .mount(&server)
            .await;

        let client = LlmHttpClient::new(config_for(&server))?;
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let embeddings = client.embed_batch(&texts).await?;
        assert_eq!(embeddings.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn embed_batch_fails_without_api_key() -> TestResult {
        let client = LlmHttpClient::new(LlmClientConfig::default())?;
        let result = client.embed_batch(&["x".to_string()]).await;
        assert!(matches!(result, Err(Error::MissingApiKey)));
        Ok(())
    }
}
