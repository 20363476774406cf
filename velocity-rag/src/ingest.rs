//! Full-directory ingestion.

use std::path::Path;

use tracing::info;

use crate::document::{Chunk, Document};
use crate::error::Result;
use crate::loader::load_text_documents;
use crate::pipeline::RagPipeline;

/// What a directory ingestion run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Filenames that were loaded, in ingestion order.
    pub files: Vec<String>,
    /// Total number of chunks written to the collection.
    pub chunk_count: usize,
}

/// Replace `collection` with the contents of every `.txt` file in `dir`.
///
/// Every run re-embeds everything, so identical input yields an identical
/// collection.
///
/// # Errors
///
/// Returns [`RagError::MissingDirectory`](crate::RagError::MissingDirectory)
/// before touching the store if `dir` does not exist.
pub async fn ingest_directory(
    pipeline: &RagPipeline,
    collection: &str,
    dir: impl AsRef<Path>,
) -> Result<IngestReport> {
    let documents = load_text_documents(dir)?;
    ingest_documents(pipeline, collection, &documents).await
}

/// Replace `collection` with `documents`.
///
/// The old collection is only dropped once every chunk has been embedded.
pub async fn ingest_documents(
    pipeline: &RagPipeline,
    collection: &str,
    documents: &[Document],
) -> Result<IngestReport> {
    let mut chunks = pipeline.chunk_documents(documents);
    pipeline.embed_chunks(&mut chunks).await?;
    replace_collection(pipeline, collection, &chunks).await?;

    let report = IngestReport {
        files: documents.iter().map(|d| d.id.clone()).collect(),
        chunk_count: chunks.len(),
    };
    info!(
        collection,
        files = report.files.len(),
        chunk_count = report.chunk_count,
        "ingestion finished"
    );
    Ok(report)
}

/// Drop `collection`, recreate it for the pipeline's embedding model and
/// write the already-embedded `chunks` into it.
pub async fn replace_collection(
    pipeline: &RagPipeline,
    collection: &str,
    chunks: &[Chunk],
) -> Result<()> {
    pipeline.reset_collection(collection).await?;
    if !chunks.is_empty() {
        pipeline.store_chunks(collection, chunks).await?;
    }
    Ok(())
}
