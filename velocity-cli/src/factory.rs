//! Builds the embedder, store and pipeline described by the command line.

use std::sync::Arc;

use anyhow::Context;
use velocity_rag::{
    Chunker, EmbeddingProvider, FixedSizeChunker, HashEmbeddingProvider, LanceVectorStore,
    OpenAIEmbeddingProvider, RagConfig, RagPipeline, RecursiveChunker,
};

use crate::args::{ChunkerKind, EmbedderKind, StoreArgs};

/// Dimensions used by the offline hash embedder.
pub const HASH_DIMENSIONS: usize = 384;

/// Create the embedding provider selected by `store`.
///
/// Loading the local model can download weights on first use.
pub fn build_embedder(store: &StoreArgs) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let model = store.embedding_model.as_deref();
    match store.embedder {
        EmbedderKind::Local => local_embedder(store),
        EmbedderKind::Openai => {
            let mut provider = OpenAIEmbeddingProvider::from_env()
                .context("the openai embedder needs OPENAI_API_KEY")?;
            if let Some(model) = model {
                provider = provider.with_model(model);
            }
            if let Some(dimensions) = store.embedding_dimensions {
                provider = provider.with_dimensions(dimensions);
            }
            Ok(Arc::new(provider))
        }
        EmbedderKind::Hash => {
            if model.is_some() {
                tracing::warn!("--embedding-model is ignored by the hash embedder");
            }
            let dimensions = store.embedding_dimensions.unwrap_or(HASH_DIMENSIONS);
            Ok(Arc::new(HashEmbeddingProvider::new(dimensions)))
        }
    }
}

#[cfg(feature = "fastembed")]
fn local_embedder(store: &StoreArgs) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let model = store.embedding_model.as_deref().unwrap_or(velocity_rag::DEFAULT_LOCAL_MODEL);
    let provider = velocity_rag::LocalEmbeddingProvider::new(model, store.embedding_cache.clone())
        .with_context(|| format!("failed to load local embedding model '{model}'"))?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "fastembed"))]
fn local_embedder(_store: &StoreArgs) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("this build has no local embedder; rebuild with the `fastembed` feature")
}

/// Create the chunker selected on the ingest command line.
pub fn build_chunker(kind: ChunkerKind, config: &RagConfig) -> Arc<dyn Chunker> {
    match kind {
        ChunkerKind::Fixed => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap))
        }
        ChunkerKind::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        }
    }
}

/// Wire a pipeline over the LanceDB store at `store.db_dir`.
pub fn build_pipeline(
    store: &StoreArgs,
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
) -> anyhow::Result<RagPipeline> {
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(LanceVectorStore::open(&store.db_dir)))
        .chunker(chunker)
        .build()?;
    Ok(pipeline)
}
