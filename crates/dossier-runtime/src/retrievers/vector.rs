//! Vector retrievers: a pgvector SQL adapter and an in-memory index.
//!
//! Both return items ranked by descending cosine similarity with
//! `kind = vector`; ties keep backend order.

use std::collections::BTreeMap;

use dossier_core::{EvidenceItem, EvidenceKind, RetrievalFilters};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::VectorRetriever;
use crate::RetrievalError;

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Json(Value),
    TextArray(Vec<String>),
    Vector(Vec<f32>),
    Int(i64),
}

/// Runs parameterised SQL against a pgvector-enabled database.
///
/// Placeholders are numbered `$1..$n` and a placeholder may appear more
/// than once. Each row is a column-name to value map.
pub trait SqlExecutor: Send + Sync {
    fn query(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Map<String, Value>>, RetrievalError>;
}

/// Table and column names used by [`PgVectorRetriever`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgVectorConfig {
    pub table: String,
    pub id_column: String,
    pub content_column: String,
    pub embedding_column: String,
    pub metadata_column: String,
    pub source_column: String,
}

impl Default for PgVectorConfig {
    fn default() -> Self {
        Self {
            table: "documents".to_string(),
            id_column: "id".to_string(),
            content_column: "content".to_string(),
            embedding_column: "embedding".to_string(),
            metadata_column: "metadata".to_string(),
            source_column: "source".to_string(),
        }
    }
}

impl PgVectorConfig {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    // Names are interpolated into SQL, so only plain identifiers pass.
    fn validate(&self) -> Result<(), RetrievalError> {
        let names = [
            &self.table,
            &self.id_column,
            &self.content_column,
            &self.embedding_column,
            &self.metadata_column,
            &self.source_column,
        ];

        for name in names {
            let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            if !valid {
                return Err(RetrievalError::Backend(format!(
                    "Invalid SQL identifier: {:?}",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Vector retriever over a pgvector table.
pub struct PgVectorRetriever<E> {
    executor: E,
    config: PgVectorConfig,
}

impl<E: SqlExecutor> PgVectorRetriever<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            config: PgVectorConfig::default(),
        }
    }

    pub fn with_config(executor: E, config: PgVectorConfig) -> Result<Self, RetrievalError> {
        config.validate()?;
        Ok(Self { executor, config })
    }

    /// Build the similarity query and its parameters.
    pub fn build_query(
        &self,
        embedding: &[f32],
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> (String, Vec<SqlParam>) {
        let c = &self.config;
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(filters) = filters {
            if let Some(metadata) = filters.metadata.as_ref().filter(|m| !m.is_empty()) {
                params.push(SqlParam::Json(Value::Object(
                    metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                )));
                clauses.push(format!("{} @> ${}::jsonb", c.metadata_column, params.len()));
            }

            if let Some(source_ids) = filters.source_ids.as_ref().filter(|s| !s.is_empty()) {
                params.push(SqlParam::TextArray(source_ids.clone()));
                clauses.push(format!("{} = ANY(${})", c.source_column, params.len()));
            }

            if let Some(tags) = filters.tags.as_ref().filter(|t| !t.is_empty()) {
                params.push(SqlParam::TextArray(tags.clone()));
                clauses.push(format!(
                    "({} -> 'tags') ?| ${}::text[]",
                    c.metadata_column,
                    params.len()
                ));
            }
        }

        params.push(SqlParam::Vector(embedding.to_vec()));
        let embedding_param = params.len();
        params.push(SqlParam::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        let limit_param = params.len();

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {id} AS id, {content} AS content, {metadata} AS metadata, \
             1 - ({embedding} <=> ${q}::vector) AS score, {source} AS source \
             FROM {table}{where_clause} \
             ORDER BY {embedding} <=> ${q}::vector \
             LIMIT ${l}",
            id = c.id_column,
            content = c.content_column,
            metadata = c.metadata_column,
            embedding = c.embedding_column,
            source = c.source_column,
            table = c.table,
            where_clause = where_clause,
            q = embedding_param,
            l = limit_param,
        );

        (sql, params)
    }
}

impl<E: SqlExecutor> VectorRetriever for PgVectorRetriever<E> {
    fn name(&self) -> &str {
        &self.config.table
    }

    fn retrieve(
        &self,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError> {
        let embedding = embedding.ok_or(RetrievalError::MissingEmbedding)?;
        let (sql, params) = self.build_query(embedding, filters, limit);

        let rows = self.executor.query(&sql, &params)?;
        tracing::debug!(table = %self.config.table, rows = rows.len(), "pgvector query complete");

        let mut items = rows
            .into_iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        rank(&mut items, limit);
        Ok(items)
    }
}

fn item_from_row(row: Map<String, Value>) -> Result<EvidenceItem, RetrievalError> {
    let id = match row.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => {
            return Err(RetrievalError::Backend("Vector row without id".to_string()))
        }
        Some(other) => other.to_string(),
    };

    let content = row.get("content").and_then(Value::as_str).unwrap_or_default();
    let mut item = EvidenceItem::new(id, content)
        .with_score(row.get("score").and_then(Value::as_f64).unwrap_or(0.0))
        .with_source(row.get("source").and_then(Value::as_str).unwrap_or("vector"))
        .with_kind(EvidenceKind::Vector);

    if let Some(Value::Object(metadata)) = row.get("metadata") {
        item.metadata = metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    Ok(item)
}

/// Stable sort by descending score, then truncate.
fn rank(items: &mut Vec<EvidenceItem>, limit: usize) {
    items.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
    items.truncate(limit);
}

/// A document held by [`InMemoryVectorIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            source: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Brute-force cosine search over documents kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) {
        self.documents.write().push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl FromIterator<Document> for InMemoryVectorIndex {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self {
            documents: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl VectorRetriever for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "memory"
    }

    fn retrieve(
        &self,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError> {
        let embedding = embedding.ok_or(RetrievalError::MissingEmbedding)?;
        let documents = self.documents.read();

        let mut items = Vec::new();
        for document in documents.iter() {
            if document.embedding.len() != embedding.len() {
                return Err(RetrievalError::Backend(format!(
                    "Embedding dimension mismatch for '{}': expected {}, got {}",
                    document.id,
                    embedding.len(),
                    document.embedding.len()
                )));
            }

            let mut item = EvidenceItem::new(document.id.clone(), document.content.clone())
                .with_score(cosine_similarity(embedding, &document.embedding))
                .with_source(document.source.as_deref().unwrap_or("vector"))
                .with_kind(EvidenceKind::Vector);
            item.metadata = document.metadata.clone();

            if filters.map_or(true, |f| f.matches(&item)) {
                items.push(item);
            }
        }

        rank(&mut items, limit);
        Ok(items)
    }
}

/// Cosine similarity; 0.0 when either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}
