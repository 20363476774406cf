//! Chunking and retrieval settings.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Characters per chunk used by both binaries.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Characters shared by neighbouring chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Number of chunks handed to the language model per question.
pub const DEFAULT_TOP_K: usize = 3;

/// How documents are cut and how many neighbours a query returns.
///
/// Values built by [`RagConfigBuilder`] are always valid; call
/// [`validate`](Self::validate) on ones that came from elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Upper bound on chunk length, in characters.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Results scoring below this cosine similarity are dropped. The default
    /// of -1.0 keeps everything, so a query always gets `top_k` chunks.
    pub similarity_threshold: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: -1.0,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] when `chunk_size` or `top_k` is zero, the
    /// overlap is not smaller than the chunk, or the threshold is outside
    /// `[-1, 1]`.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.chunk_size == 0 {
            "chunk_size must be greater than zero".to_string()
        } else if self.chunk_overlap >= self.chunk_size {
            format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )
        } else if self.top_k == 0 {
            "top_k must be greater than zero".to_string()
        } else if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            format!("similarity_threshold ({}) must be within [-1, 1]", self.similarity_threshold)
        } else {
            return Ok(());
        };
        Err(RagError::ConfigError(problem))
    }
}

/// Builds a [`RagConfig`] starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Validate and return the config. See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
