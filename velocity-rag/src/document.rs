//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key holding the originating filename.
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding the [`DocumentKind`] tag.
pub const TYPE_KEY: &str = "type";

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Coarse classification of a source file, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Price lists and spec sheets.
    Technical,
    /// Everything else.
    General,
}

impl DocumentKind {
    /// Classify a file by name: anything mentioning `price` or `specs` is technical.
    pub fn from_filename(filename: &str) -> Self {
        let lowered = filename.to_lowercase();
        if lowered.contains("price") || lowered.contains("specs") {
            Self::Technical
        } else {
            Self::General
        }
    }

    /// The tag stored under [`TYPE_KEY`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::General => "general",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Build a document for a file, tagging `source` and `type` from its name.
    pub fn from_file(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let filename = filename.into();
        let kind = DocumentKind::from_filename(&filename);
        let metadata = HashMap::from([
            (SOURCE_KEY.to_string(), filename.clone()),
            (TYPE_KEY.to_string(), kind.as_str().to_string()),
        ]);
        Self { id: filename, text: text.into(), metadata, source_uri: None }
    }

    /// Attach the full path or URI the text was read from.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// The originating filename, if the chunk carries one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
