//! `velocity-ingest`: chunk, embed and persist every `.txt` file in the data
//! directory, replacing whatever the collection held before.

use clap::Parser;
use velocity_cli::factory::{build_chunker, build_embedder, build_pipeline};
use velocity_cli::{IngestArgs, telemetry};
use velocity_rag::{RagError, load_text_documents, replace_collection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = IngestArgs::parse();
    telemetry::init();

    println!("Starting Ingestion...");

    let documents = match load_text_documents(&args.data_dir) {
        Ok(documents) => documents,
        Err(RagError::MissingDirectory(dir)) => {
            println!("Error: {} directory not found.", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    for document in &documents {
        println!("   - Loaded: {}", document.id);
    }

    let config = args.rag_config()?;
    let chunker = build_chunker(args.chunker, &config);
    let embedder = build_embedder(&args.store)?;
    let model = embedder.model_id().to_string();
    let pipeline = build_pipeline(&args.store, config, embedder, chunker)?;

    let mut chunks = pipeline.chunk_documents(&documents);
    println!("Generated {} text chunks.", chunks.len());

    println!("Generating Embeddings ({model})...");
    pipeline.embed_chunks(&mut chunks).await?;

    println!("Saving to Vector Database...");
    replace_collection(&pipeline, &args.store.collection, &chunks).await?;
    tracing::debug!(chunks = chunks.len(), "collection rewritten");

    println!("Ingestion Complete! Database saved to {}", args.store.db_dir.display());
    Ok(())
}
