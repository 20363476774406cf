//! The crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a `.txt` file and printing an answer.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A pipeline step failed, or the collection has not been ingested yet.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// The directory to ingest from does not exist.
    #[error("{} directory not found", .0.display())]
    MissingDirectory(PathBuf),

    /// A collection was written with one embedding model and read with another.
    #[error(
        "collection '{collection}' was built with embedding model '{stored}', \
         but '{requested}' was requested"
    )]
    EmbeddingModelMismatch {
        /// The collection being opened.
        collection: String,
        /// The model recorded when the collection was created.
        stored: String,
        /// The model the caller is using now.
        requested: String,
    },

    #[error("LLM error ({model}): {message}")]
    LlmError { model: String, message: String },

    /// A prompt template is malformed.
    #[error("Prompt error: {0}")]
    PromptError(String),

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Persisted data could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// `Result` with [`RagError`].
pub type Result<T> = std::result::Result<T, RagError>;
