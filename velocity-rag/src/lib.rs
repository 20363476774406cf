//! # velocity-rag
//!
//! Retrieval-Augmented Generation over the VelocityAI sales knowledge base.
//!
//! ## Overview
//!
//! Two workflows share one persisted vector store:
//!
//! - **Ingestion**: [`load_text_documents`] → [`Chunker`] → [`EmbeddingProvider`]
//!   → [`VectorStore`], driven by [`ingest_directory`].
//! - **Query**: [`RagPipeline::query`] retrieves the nearest chunks,
//!   [`PromptTemplate`] wraps them with the question, and a [`ChatModel`]
//!   writes the answer. [`SalesAssistant`] ties the three together.
//!
//! Collections remember which embedding model built them; querying with a
//! different model fails with [`RagError::EmbeddingModelMismatch`].
//!
//! ## Features
//!
//! - `fastembed` (default): [`LocalEmbeddingProvider`], running
//!   all-MiniLM-L6-v2 in-process.
//! - `lancedb` (default): [`LanceVectorStore`], the on-disk store the
//!   binaries use. Without it only [`InMemoryVectorStore`] is available.

pub mod assistant;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
mod http;
pub mod ingest;
pub mod inmemory;
#[cfg(feature = "lancedb")]
pub mod lance;
pub mod llm;
pub mod loader;
#[cfg(feature = "fastembed")]
pub mod local;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

pub use assistant::{Answer, SalesAssistant, UNKNOWN_SOURCE, distinct_sources};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, DocumentKind, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use ingest::{IngestReport, ingest_directory, ingest_documents, replace_collection};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "lancedb")]
pub use lance::LanceVectorStore;
pub use llm::{ChatModel, DEFAULT_CHAT_MODEL, GROQ_API_BASE, GROQ_API_KEY_ENV, GroqChatModel};
pub use loader::{discover_text_files, load_text_documents};
#[cfg(feature = "fastembed")]
pub use local::{DEFAULT_LOCAL_MODEL, LocalEmbeddingProvider};
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{FALLBACK_ANSWER, PromptTemplate, format_context};
pub use vectorstore::{CollectionInfo, VectorStore, cosine_similarity};
