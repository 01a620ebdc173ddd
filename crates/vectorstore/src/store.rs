//! `VectorStore`: collections, HNSW indexes, inserts, and similarity search
//! realized on top of an embedded SurrealDB instance.
//!
//! The original backend (Milvus, `IVF_FLAT`/`nlist=128`) isn't part of this
//! workspace's dependency stack. SurrealDB ships a native HNSW vector index
//! (`DEFINE INDEX ... HNSW`), so the same operation contract is realized
//! against that instead; `top_n`/`expr`/`output_fields` semantics are
//! unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

use crate::config::StoreConfig;
use crate::error::{Error, Result, from_surrealdb_error};

/// A column in a collection's schema.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The SurrealQL type a field is defined with.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Bool,
    Array,
    Object,
    /// A fixed-dimension float vector, eligible for an HNSW index.
    Vector(usize),
}

impl FieldKind {
    fn surql_type(self) -> String {
        match self {
            Self::Text => "string".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Array => "array".to_string(),
            Self::Object => "object".to_string(),
            Self::Vector(dim) => format!("array<float, {dim}>"),
        }
    }
}

/// HNSW index parameters for [`VectorStore::ensure_index`].
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    pub dimension: usize,
    pub distance: DistanceMetric,
}

#[derive(Debug, Clone, Copy)]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
}

impl DistanceMetric {
    const fn surql(self) -> &'static str {
        match self {
            Self::Cosine => "COSINE",
            Self::Euclidean => "EUCLIDEAN",
        }
    }
}

/// One row returned from `search`/`search_many`, sorted ascending by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f64,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The chunked vector store's operation contract (§4.7).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent; open it if present. Idempotent.
    async fn create_collection(&self, name: &str, fields: &[FieldDef], description: &str) -> Result<()>;

    /// Create an HNSW index on `field` only if one doesn't already exist.
    async fn ensure_index(&self, name: &str, field: &str, params: IndexParams) -> Result<()>;

    /// Load collections into memory before querying. A no-op validation
    /// step for an embedded store, which is always resident.
    async fn load(&self, names: &[String]) -> Result<()>;

    /// Batch insert rows into a collection, returning the count inserted.
    async fn insert(&self, name: &str, rows: Vec<Value>) -> Result<usize>;

    /// Similarity search within one collection, sorted ascending by score.
    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        expr: Option<&str>,
        output_fields: &[String],
        top_n: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Search across several collections, tag each hit with its source
    /// collection, resort globally by score, and truncate to `top_n`.
    async fn search_many(
        &self,
        names: &[String],
        vector: &[f32],
        expr: Option<&str>,
        output_fields: &[String],
        top_n: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Non-vector filter query.
    async fn query(&self, name: &str, expr: Option<&str>, output_fields: &[String], limit: usize) -> Result<Vec<Value>>;

    /// `[ADDED]` Best-effort in-place rewrite of a row's `topics` array,
    /// used only by the topic-change synchronizer (§4.8). Not part of the
    /// core seven-operation contract; backends without an update primitive
    /// may no-op.
    async fn update_topics(&self, _name: &str, _paper_id: &str, _section: &str, _topics: &[String]) -> Result<usize> {
        Ok(0)
    }
}

/// SurrealDB-backed implementation of [`VectorStore`].
#[derive(Debug, Clone)]
pub struct SurrealVectorStore {
    db: Arc<Surreal<Any>>,
}

fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn select_clause(output_fields: &[String]) -> String {
    if output_fields.is_empty() {
        "*".to_string()
    } else {
        output_fields.join(", ")
    }
}

impl SurrealVectorStore {
    /// Connect and select namespace/database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, authentication, or namespace
    /// selection fails.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let db = Surreal::<Any>::init();

        db.connect(&config.url).await.map_err(from_surrealdb_error)?;

        if let Some(creds) = &config.credentials {
            db.signin(Root {
                username: &creds.username,
                password: &creds.password,
            })
            .await
            .map_err(from_surrealdb_error)?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(from_surrealdb_error)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn check_identifier(name: &str) -> Result<()> {
        if is_safe_identifier(name) {
            Ok(())
        } else {
            Err(Error::schema_error(format!("invalid identifier: {name}")))
        }
    }
}

#[async_trait]
impl VectorStore for SurrealVectorStore {
    async fn create_collection(&self, name: &str, fields: &[FieldDef], description: &str) -> Result<()> {
        Self::check_identifier(name)?;

        let define_table = format!(
            "DEFINE TABLE IF NOT EXISTS {name} SCHEMAFULL COMMENT '{}';",
            description.replace('\'', "\\'")
        );
        self.db
            .query(define_table)
            .await
            .map_err(from_surrealdb_error)?;

        for field in fields {
            Self::check_identifier(&field.name)?;
            let define_field = format!(
                "DEFINE FIELD IF NOT EXISTS {} ON TABLE {name} TYPE {};",
                field.name,
                field.kind.surql_type()
            );
            self.db
                .query(define_field)
                .await
                .map_err(from_surrealdb_error)?;
        }

        Ok(())
    }

    async fn ensure_index(&self, name: &str, field: &str, params: IndexParams) -> Result<()> {
        Self::check_identifier(name)?;
        Self::check_identifier(field)?;

        let index_name = format!("idx_{name}_{field}_hnsw");
        let statement = format!(
            "DEFINE INDEX IF NOT EXISTS {index_name} ON TABLE {name} FIELDS {field} HNSW DIMENSION {} DIST {};",
            params.dimension,
            params.distance.surql()
        );
        self.db.query(statement).await.map_err(from_surrealdb_error)?;
        Ok(())
    }

    async fn load(&self, names: &[String]) -> Result<()> {
        for name in names {
            Self::check_identifier(name)?;
            let statement = format!("INFO FOR TABLE {name};");
            self.db
                .query(statement)
                .await
                .map_err(|e| Error::collection_not_found(format!("{name}: {e}")))?;
        }
        Ok(())
    }

    async fn insert(&self, name: &str, rows: Vec<Value>) -> Result<usize> {
        Self::check_identifier(name)?;
        let count = rows.len();
        if rows.is_empty() {
            return Ok(0);
        }

        self.db
            .insert::<Vec<Value>>(name)
            .content(rows)
            .await
            .map_err(from_surrealdb_error)?;

        Ok(count)
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        expr: Option<&str>,
        output_fields: &[String],
        top_n: usize,
    ) -> Result<Vec<SearchHit>> {
        Self::check_identifier(name)?;

        let fields = select_clause(output_fields);
        let filter = expr.map(|e| format!(" AND ({e})")).unwrap_or_default();
        let statement = format!(
            "SELECT {fields}, vector::distance::knn() AS score FROM {name} WHERE embedding <|{top_n}|> $vector{filter} ORDER BY score LIMIT {top_n};"
        );

        let mut response = self
            .db
            .query(statement)
            .bind(("vector", vector.to_vec()))
            .await
            .map_err(from_surrealdb_error)?;

        let hits: Vec<SearchHit> = response.take(0).map_err(from_surrealdb_error)?;
        Ok(hits)
    }

    async fn search_many(
        &self,
        names: &[String],
        vector: &[f32],
        expr: Option<&str>,
        output_fields: &[String],
        top_n: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut all_hits = Vec::new();

        for name in names {
            let mut hits = self.search(name, vector, expr, output_fields, top_n).await?;
            for hit in &mut hits {
                hit.collection = Some(name.clone());
            }
            all_hits.extend(hits);
        }

        all_hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        all_hits.truncate(top_n);
        Ok(all_hits)
    }

    async fn query(&self, name: &str, expr: Option<&str>, output_fields: &[String], limit: usize) -> Result<Vec<Value>> {
        Self::check_identifier(name)?;

        let fields = select_clause(output_fields);
        let filter = expr.map(|e| format!(" WHERE {e}")).unwrap_or_default();
        let statement = format!("SELECT {fields} FROM {name}{filter} LIMIT {limit};");

        let mut response = self.db.query(statement).await.map_err(from_surrealdb_error)?;
        let rows: Vec<Value> = response.take(0).map_err(from_surrealdb_error)?;
        Ok(rows)
    }

    async fn update_topics(&self, name: &str, paper_id: &str, section: &str, topics: &[String]) -> Result<usize> {
        Self::check_identifier(name)?;

        let statement =
            format!("UPDATE {name} SET topics = $topics WHERE paper_id = $paper_id AND section = $section;");
        let mut response = self
            .db
            .query(statement)
            .bind(("topics", topics.to_vec()))
            .bind(("paper_id", paper_id.to_string()))
            .bind(("section", section.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        let rows: Vec<Value> = response.take(0).map_err(from_surrealdb_error)?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn create_collection_and_insert_round_trips() -> TestResult {
        let store = SurrealVectorStore::connect(StoreConfig::in_memory(4)).await?;

        store
            .create_collection(
                "paper_method",
                &[
                    FieldDef::new("paper_id", FieldKind::Text),
                    FieldDef::new("text", FieldKind::Text),
                    FieldDef::new("embedding", FieldKind::Vector(4)),
                ],
                "method section chunks",
            )
            .await?;

        store
            .ensure_index(
                "paper_method",
                "embedding",
                IndexParams {
                    dimension: 4,
                    distance: DistanceMetric::Cosine,
                },
            )
            .await?;

        let inserted = store
            .insert(
                "paper_method",
                vec![serde_json::json!({
                    "paper_id": "p1",
                    "text": "a method section",
                    "embedding": [0.1, 0.2, 0.3, 0.4],
                })],
            )
            .await?;

        assert_eq!(inserted, 1);
        Ok(())
    }

    #[tokio::test]
    async fn insert_empty_rows_is_a_no_op() -> TestResult {
        let store = SurrealVectorStore::connect(StoreConfig::in_memory(4)).await?;
        store
            .create_collection("paper_method", &[FieldDef::new("text", FieldKind::Text)], "")
            .await?;

        let inserted = store.insert("paper_method", vec![]).await?;
        assert_eq!(inserted, 0);
        Ok(())
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(!is_safe_identifier("papers; DROP TABLE x"));
        assert!(is_safe_identifier("summary_background"));
    }
}
