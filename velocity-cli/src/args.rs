//! Command-line arguments for the ingest and query binaries.
//!
//! Every option can also come from a `VELOCITY_*` environment variable, and
//! both binaries load `.env` before parsing.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use velocity_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K};
use velocity_rag::{DEFAULT_CHAT_MODEL, GROQ_API_BASE, GROQ_API_KEY_ENV, RagConfig};

/// Question asked when none is given on the command line.
pub const DEFAULT_QUESTION: &str = "How is VelocityAI better than LegacyCRM?";

/// Which embedding backend to use. Ingest and query must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// all-MiniLM-L6-v2 running in-process.
    Local,
    /// An OpenAI-compatible `/embeddings` API (reads `OPENAI_API_KEY`).
    Openai,
    /// Deterministic feature hashing, for offline smoke runs.
    Hash,
}

impl Default for EmbedderKind {
    fn default() -> Self {
        if cfg!(feature = "fastembed") { Self::Local } else { Self::Hash }
    }
}

/// How documents are split before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChunkerKind {
    /// Exact character windows with a fixed overlap.
    #[default]
    Fixed,
    /// Paragraph, line, sentence, then word boundaries.
    Recursive,
}

/// Options shared by both binaries: where the store lives and how it is embedded.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Directory holding the persisted vector store.
    #[arg(long, env = "VELOCITY_DB_DIR", default_value = "./chroma_db")]
    pub db_dir: PathBuf,

    /// Collection name inside the store.
    #[arg(long, env = "VELOCITY_COLLECTION", default_value = "velocity_docs")]
    pub collection: String,

    /// Embedding backend.
    #[arg(long, env = "VELOCITY_EMBEDDER", value_enum, default_value_t = EmbedderKind::default())]
    pub embedder: EmbedderKind,

    /// Embedding model name; each backend has its own default.
    #[arg(long, env = "VELOCITY_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Vector width for the hash embedder or API models outside OpenAI's catalogue.
    #[arg(long, env = "VELOCITY_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Where local model weights are cached.
    #[arg(long, env = "VELOCITY_EMBEDDING_CACHE")]
    pub embedding_cache: Option<PathBuf>,
}

/// Load `.txt` files into the vector store.
#[derive(Debug, Clone, Parser)]
#[command(name = "velocity-ingest", version, about)]
pub struct IngestArgs {
    /// Directory of `.txt` files to ingest.
    #[arg(long, env = "VELOCITY_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Chunking strategy.
    #[arg(long, value_enum, default_value_t = ChunkerKind::default())]
    pub chunker: ChunkerKind,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared by neighbouring chunks.
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,
}

impl IngestArgs {
    /// Validated pipeline settings for ingestion.
    pub fn rag_config(&self) -> velocity_rag::Result<RagConfig> {
        RagConfig::builder().chunk_size(self.chunk_size).chunk_overlap(self.chunk_overlap).build()
    }
}

/// Answer a question from the ingested documents.
#[derive(Debug, Clone, Parser)]
#[command(name = "velocity-query", version, about)]
pub struct QueryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Number of chunks handed to the model.
    #[arg(long, env = "VELOCITY_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Chat model used to write the answer.
    #[arg(long, env = "VELOCITY_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Base URL of the OpenAI-compatible chat API.
    #[arg(long, env = "VELOCITY_LLM_BASE_URL", default_value = GROQ_API_BASE)]
    pub llm_base_url: String,

    /// Groq API key.
    #[arg(long, env = GROQ_API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// The question; words are joined with single spaces and may start with `-`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub question: Vec<String>,
}

impl QueryArgs {
    /// The question to ask, falling back to [`DEFAULT_QUESTION`].
    pub fn question(&self) -> String {
        if self.question.is_empty() {
            DEFAULT_QUESTION.to_string()
        } else {
            self.question.join(" ")
        }
    }

    /// Validated pipeline settings for retrieval.
    pub fn rag_config(&self) -> velocity_rag::Result<RagConfig> {
        RagConfig::builder().top_k(self.top_k).build()
    }
}

/// The API key, if one was given and is not blank.
pub fn require_api_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}
