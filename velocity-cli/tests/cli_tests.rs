//! Argument parsing and pipeline wiring for the two binaries.

use std::fs;

use clap::Parser;
use velocity_cli::factory::{HASH_DIMENSIONS, build_chunker, build_embedder, build_pipeline};
use velocity_cli::{ChunkerKind, DEFAULT_QUESTION, EmbedderKind, IngestArgs, QueryArgs};
use velocity_rag::{ingest_documents, load_text_documents};

#[test]
fn question_words_are_joined_with_spaces() {
    let args = QueryArgs::try_parse_from([
        "velocity-query",
        "--embedder",
        "hash",
        "What",
        "does",
        "Growth",
        "cost?",
    ])
    .unwrap();
    assert_eq!(args.question(), "What does Growth cost?");
}

#[test]
fn missing_question_falls_back_to_the_default() {
    let args = QueryArgs::try_parse_from(["velocity-query", "--embedder", "hash"]).unwrap();
    assert_eq!(args.question(), DEFAULT_QUESTION);
}

#[test]
fn flags_override_store_location_and_collection() {
    let args = IngestArgs::try_parse_from([
        "velocity-ingest",
        "--data-dir",
        "/tmp/corpus",
        "--db-dir",
        "/tmp/store",
        "--collection",
        "battlecards",
        "--embedder",
        "hash",
        "--chunker",
        "recursive",
    ])
    .unwrap();
    assert_eq!(args.data_dir.to_str(), Some("/tmp/corpus"));
    assert_eq!(args.store.db_dir.to_str(), Some("/tmp/store"));
    assert_eq!(args.store.collection, "battlecards");
    assert_eq!(args.store.embedder, EmbedderKind::Hash);
    assert_eq!(args.chunker, ChunkerKind::Recursive);
}

#[test]
fn invalid_chunk_settings_are_rejected() {
    let args = IngestArgs::try_parse_from([
        "velocity-ingest",
        "--chunk-size",
        "50",
        "--chunk-overlap",
        "50",
    ])
    .unwrap();
    assert!(args.rag_config().is_err());
}

#[test]
fn zero_top_k_is_rejected() {
    let args = QueryArgs::try_parse_from(["velocity-query", "--top-k", "0"]).unwrap();
    assert!(args.rag_config().is_err());
}

#[test]
fn unknown_embedder_fails_to_parse() {
    assert!(IngestArgs::try_parse_from(["velocity-ingest", "--embedder", "chroma"]).is_err());
}

#[tokio::test]
async fn hash_embedder_round_trips_through_the_lance_store() {
    let temp = tempfile::tempdir().unwrap();
    let data = temp.path().join("data");
    let db = temp.path().join("db");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("pricing.txt"), "Growth costs $49 per seat per month. ".repeat(30))
        .unwrap();

    let args = IngestArgs::try_parse_from([
        "velocity-ingest",
        "--data-dir",
        data.to_str().unwrap(),
        "--db-dir",
        db.to_str().unwrap(),
        "--embedder",
        "hash",
    ])
    .unwrap();

    let config = args.rag_config().unwrap();
    let embedder = build_embedder(&args.store).unwrap();
    assert_eq!(embedder.dimensions(), HASH_DIMENSIONS);
    let chunker = build_chunker(args.chunker, &config);
    let pipeline = build_pipeline(&args.store, config, embedder, chunker).unwrap();

    let documents = load_text_documents(&args.data_dir).unwrap();
    let report = ingest_documents(&pipeline, &args.store.collection, &documents).await.unwrap();
    assert_eq!(report.files, ["pricing.txt"]);
    assert!(report.chunk_count > 1);
    assert!(db.join("velocity_docs.lance").is_dir());

    let results = pipeline.query(&args.store.collection, "Growth seat price").await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.chunk.source() == Some("pricing.txt")));
}
