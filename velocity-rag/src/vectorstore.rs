//! Vector store trait for storing and searching vector embeddings.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Properties a collection is created with and checked against later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Length of every embedding in the collection.
    pub dimensions: usize,
    /// Identifier of the embedding model that produced the vectors.
    pub embedding_model: String,
    /// When the collection was created.
    pub created_at: DateTime<Utc>,
}

impl CollectionInfo {
    /// Describe a collection created now.
    pub fn new(dimensions: usize, embedding_model: impl Into<String>) -> Self {
        Self { dimensions, embedding_model: embedding_model.into(), created_at: Utc::now() }
    }
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s and support
/// upserting, deleting, and searching by vector similarity.
///
/// # Example
///
/// ```rust,ignore
/// use velocity_rag::{CollectionInfo, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", &CollectionInfo::new(384, "all-MiniLM-L6-v2")).await?;
/// store.upsert("docs", &chunks).await?;
/// let results = store.search("docs", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, info: &CollectionInfo) -> Result<()>;

    /// Return the collection's creation properties, or `None` if it does not exist.
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Delete chunks by their IDs from a collection.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// One in-memory collection.
///
/// Chunks are keyed by ID in a `BTreeMap` so iteration and tie-breaking in
/// search are deterministic.
#[derive(Debug, Clone)]
pub(crate) struct Collection {
    pub(crate) info: CollectionInfo,
    pub(crate) chunks: BTreeMap<String, Chunk>,
}

impl Collection {
    pub(crate) fn new(info: CollectionInfo) -> Self {
        Self { info, chunks: BTreeMap::new() }
    }

    pub(crate) fn upsert(&mut self, backend: &str, chunks: &[Chunk]) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.info.dimensions) {
            return Err(wrong_width(backend, &bad.id, bad.embedding.len(), self.info.dimensions));
        }
        for chunk in chunks {
            self.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    pub(crate) fn delete(&mut self, ids: &[&str]) {
        for id in ids {
            self.chunks.remove(*id);
        }
    }

    pub(crate) fn search(
        &self,
        backend: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        check_query_width(backend, embedding.len(), self.info.dimensions)?;
        let mut scored: Vec<SearchResult> = self
            .chunks
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        // Stable sort keeps ID order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub(crate) fn wrong_width(backend: &str, id: &str, actual: usize, expected: usize) -> RagError {
    RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("chunk '{id}' has {actual} dimensions, collection expects {expected}"),
    }
}

/// A query vector must be as wide as the vectors it is compared with.
pub(crate) fn check_query_width(backend: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        return Ok(());
    }
    Err(RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("query has {actual} dimensions, collection expects {expected}"),
    })
}

pub(crate) fn missing_collection(backend: &str, name: &str) -> RagError {
    RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("collection '{name}' does not exist"),
    }
}
