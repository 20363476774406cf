//! Composes chunker, embedder and store into the ingest and retrieval flows.
//!
//! ```rust,ignore
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .vector_store(Arc::new(LanceVectorStore::open("./chroma_db")))
//!     .chunker(Arc::new(FixedSizeChunker::new(500, 50)))
//!     .build()?;
//!
//! pipeline.reset_collection("velocity_docs").await?;
//! pipeline.ingest_batch("velocity_docs", &documents).await?;
//! let hits = pipeline.query("velocity_docs", "How do we beat LegacyCRM?").await?;
//! ```

use std::fmt::Display;
use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

/// Most texts sent to the embedding provider in one call.
pub const EMBED_BATCH_SIZE: usize = 256;

/// Log a failed step and turn it into a [`RagError::PipelineError`].
fn step_failed(step: &str, subject: &str, cause: impl Display) -> RagError {
    error!(step, subject, error = %cause, "pipeline step failed");
    RagError::PipelineError(format!("{step} failed for '{subject}': {cause}"))
}

/// Ingests documents into, and answers nearest-neighbour queries from, a
/// [`VectorStore`] collection.
///
/// Every collection is stamped with the embedding model that filled it, and
/// both ingestion and querying refuse to mix vectors from different models.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// The identity new collections are stamped with.
    pub fn collection_info(&self) -> CollectionInfo {
        let provider = &self.embedding_provider;
        CollectionInfo::new(provider.dimensions(), provider.model_id())
    }

    /// Create `name` for this pipeline's embedding model. No-op if it exists.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.vector_store
            .create_collection(name, &self.collection_info())
            .await
            .map_err(|e| step_failed("create collection", name, e))
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store
            .delete_collection(name)
            .await
            .map_err(|e| step_failed("delete collection", name, e))
    }

    /// Drop `name` if present and recreate it empty.
    pub async fn reset_collection(&self, name: &str) -> Result<()> {
        self.delete_collection(name).await?;
        self.create_collection(name).await?;
        info!(collection = name, model = self.embedding_provider.model_id(), "collection reset");
        Ok(())
    }

    /// Check that `collection` exists and was built with this pipeline's embedding model.
    ///
    /// # Errors
    ///
    /// [`RagError::PipelineError`] if the collection is missing,
    /// [`RagError::EmbeddingModelMismatch`] if its model or width differ.
    pub async fn ensure_compatible(&self, collection: &str) -> Result<CollectionInfo> {
        let Some(stored) = self.vector_store.collection_info(collection).await? else {
            return Err(RagError::PipelineError(format!(
                "collection '{collection}' not found; run ingestion first"
            )));
        };

        let wanted = self.collection_info();
        if stored.embedding_model == wanted.embedding_model
            && stored.dimensions == wanted.dimensions
        {
            return Ok(stored);
        }

        error!(
            collection,
            stored = %stored.embedding_model,
            requested = %wanted.embedding_model,
            "embedding model mismatch"
        );
        Err(RagError::EmbeddingModelMismatch {
            collection: collection.to_string(),
            stored: format!("{} ({} dims)", stored.embedding_model, stored.dimensions),
            requested: format!("{} ({} dims)", wanted.embedding_model, wanted.dimensions),
        })
    }

    /// Split `documents` into chunks, in document order. Embeddings are left empty.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunker.chunk(document)).collect()
    }

    /// Fill in the embedding of every chunk, `EMBED_BATCH_SIZE` texts per request.
    pub async fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        for batch in chunks.chunks_mut(EMBED_BATCH_SIZE) {
            let subject = batch.first().map(|c| c.document_id.clone()).unwrap_or_default();
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self
                .embedding_provider
                .embed_batch(&texts)
                .await
                .map_err(|e| step_failed("embedding", &subject, e))?;
            if vectors.len() != batch.len() {
                return Err(step_failed(
                    "embedding",
                    &subject,
                    format!("{} vectors for {} chunks", vectors.len(), batch.len()),
                ));
            }
            for (chunk, vector) in batch.iter_mut().zip(vectors) {
                chunk.embedding = vector;
            }
        }
        Ok(())
    }

    /// Write embedded chunks to an existing, compatible collection in one upsert.
    pub async fn store_chunks(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        self.ensure_compatible(collection).await?;
        self.vector_store
            .upsert(collection, chunks)
            .await
            .map_err(|e| step_failed("upsert", collection, e))?;
        info!(collection, chunk_count = chunks.len(), "stored chunks");
        Ok(())
    }

    /// Chunk, embed and store one document, returning the stored chunks.
    ///
    /// Does not check model compatibility; [`ingest_batch`](Self::ingest_batch) does.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, "document produced no chunks");
            return Ok(chunks);
        }

        self.embed_chunks(&mut chunks).await?;
        self.vector_store
            .upsert(collection, &chunks)
            .await
            .map_err(|e| step_failed("upsert", &document.id, e))?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest `documents` into an existing, compatible collection.
    ///
    /// Everything is embedded before the single write, so a failed embedding
    /// leaves the collection as it was.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        self.ensure_compatible(collection).await?;
        let mut chunks = self.chunk_documents(documents);
        self.embed_chunks(&mut chunks).await?;
        if !chunks.is_empty() {
            self.store_chunks(collection, &chunks).await?;
        }
        Ok(chunks)
    }

    /// The `top_k` chunks nearest to `query`, best first, minus any scoring
    /// below the configured similarity threshold.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.ensure_compatible(collection).await?;

        let vector = self
            .embedding_provider
            .embed(query)
            .await
            .map_err(|e| step_failed("query embedding", collection, e))?;
        let mut results = self
            .vector_store
            .search(collection, &vector, self.config.top_k)
            .await
            .map_err(|e| step_failed("search", collection, e))?;

        let threshold = self.config.similarity_threshold;
        results.retain(|r| r.score >= threshold);

        info!(collection, top_k = self.config.top_k, result_count = results.len(), "query done");
        Ok(results)
    }
}

/// Builder for [`RagPipeline`]; every part is required.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

fn required<T>(part: Option<T>, name: &str) -> Result<T> {
    part.ok_or_else(|| RagError::ConfigError(format!("{name} is required")))
}

impl RagPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] naming the first missing part, or describing
    /// why the config is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = required(self.config, "config")?;
        config.validate()?;
        Ok(RagPipeline {
            config,
            embedding_provider: required(self.embedding_provider, "embedding_provider")?,
            vector_store: required(self.vector_store, "vector_store")?,
            chunker: required(self.chunker, "chunker")?,
        })
    }
}
