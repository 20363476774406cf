//! Local sentence-embedding provider backed by [fastembed](https://docs.rs/fastembed).
//!
//! This module is only available when the `fastembed` feature is enabled.
//! Model weights are downloaded once into the cache directory and inference
//! runs on the CPU, so ingestion costs nothing per call.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default sentence-transformers model.
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

/// Both supported models emit 384-dimensional vectors.
const LOCAL_DIMENSIONS: usize = 384;

/// The fastembed model for `name` and the id collections are stamped with.
/// Hub-style aliases map to the same id so they can share a collection.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, &'static str)> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, DEFAULT_LOCAL_MODEL))
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
            Ok((EmbeddingModel::BGESmallENV15, "bge-small-en-v1.5"))
        }
        other => Err(RagError::EmbeddingError {
            provider: "fastembed".into(),
            message: format!("unsupported local model '{other}'"),
        }),
    }
}

/// An [`EmbeddingProvider`] that runs a sentence-transformers model in-process.
///
/// # Example
///
/// ```rust,ignore
/// use velocity_rag::LocalEmbeddingProvider;
///
/// let provider = LocalEmbeddingProvider::new("all-MiniLM-L6-v2", None)?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), 384);
/// ```
pub struct LocalEmbeddingProvider {
    model: Arc<TextEmbedding>,
    model_id: &'static str,
}

impl LocalEmbeddingProvider {
    /// Load (downloading on first use) the named model.
    ///
    /// `cache_dir` overrides fastembed's default `.fastembed_cache`.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (model, model_id) = resolve_model(model_name)?;
        let mut options = InitOptions::new(model);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        info!(model = model_id, "loading local embedding model");
        let model = TextEmbedding::try_new(options).map_err(|e| {
            error!(provider = "fastembed", error = %e, "model initialisation failed");
            RagError::EmbeddingError {
                provider: "fastembed".into(),
                message: format!("failed to load '{model_name}': {e}"),
            }
        })?;

        Ok(Self { model: Arc::new(model), model_id })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "fastembed".into(),
            message: "model returned no embedding".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "fastembed", batch_size = texts.len(), "embedding batch");

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();

        // Inference is CPU-bound; keep it off the async worker.
        tokio::task::spawn_blocking(move || model.embed(owned, None))
            .await
            .map_err(|e| RagError::EmbeddingError {
                provider: "fastembed".into(),
                message: format!("embedding task panicked: {e}"),
            })?
            .map_err(|e| {
                error!(provider = "fastembed", error = %e, "inference failed");
                RagError::EmbeddingError {
                    provider: "fastembed".into(),
                    message: format!("inference failed: {e}"),
                }
            })
    }

    fn dimensions(&self) -> usize {
        LOCAL_DIMENSIONS
    }

    fn model_id(&self) -> &str {
        self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_models_are_rejected() {
        assert!(matches!(
            resolve_model("text-embedding-3-small"),
            Err(RagError::EmbeddingError { .. })
        ));
        let (_, id) = resolve_model("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        assert_eq!(id, DEFAULT_LOCAL_MODEL);
    }
}
