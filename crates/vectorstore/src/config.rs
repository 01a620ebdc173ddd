//! Connection configuration for the embedded vector store.

/// Root credentials for authenticated connections.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Configuration for [`crate::store::SurrealVectorStore::connect`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection URL (`mem://`, `rocksdb://path`, `ws://host:port`, ...).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<Credentials>,
    /// Embedding dimension used by HNSW index definitions.
    pub embedding_dim: usize,
}

impl StoreConfig {
    /// In-memory store, suitable for tests and scratch runs.
    #[must_use]
    pub fn in_memory(embedding_dim: usize) -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "paperloom".to_string(),
            database: "knowledge".to_string(),
            credentials: None,
            embedding_dim,
        }
    }

    /// Persistent on-disk store backed by RocksDB.
    #[must_use]
    pub fn rocksdb(path: &str, embedding_dim: usize) -> Self {
        Self {
            url: format!("rocksdb://{path}"),
            namespace: "paperloom".to_string(),
            database: "knowledge".to_string(),
            credentials: None,
            embedding_dim,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

impl From<&paperloom_core::config::VectorDbConfig> for StoreConfig {
    fn from(cfg: &paperloom_core::config::VectorDbConfig) -> Self {
        Self {
            url: format!("ws://{}:{}", cfg.host, cfg.port),
            namespace: "paperloom".to_string(),
            database: cfg.database.clone(),
            credentials: None,
            embedding_dim: cfg.embedding_dim,
        }
    }
}
