//! Property tests for the ingestion chunk layout.

use proptest::prelude::*;
use velocity_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use velocity_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use velocity_rag::document::Document;

fn suffix(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}

fn prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Chunks from the default ingest settings are at most 500 characters,
/// neighbours share exactly 50, and stitching them back reproduces the text.
mod prop_fixed_layout {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn bounded_overlapping_and_lossless(text in "[a-zA-Zé .,\n]{1,2000}") {
            let doc = Document::from_file("battlecard.txt", text.clone());
            let chunker = FixedSizeChunker::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
            let chunks = chunker.chunk(&doc);

            prop_assert!(!chunks.is_empty());
            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() <= DEFAULT_CHUNK_SIZE);
                prop_assert_eq!(chunk.source(), Some("battlecard.txt"));
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(
                    suffix(&pair[0].text, DEFAULT_CHUNK_OVERLAP),
                    prefix(&pair[1].text, DEFAULT_CHUNK_OVERLAP)
                );
            }

            let mut rebuilt = chunks[0].text.clone();
            for chunk in &chunks[1..] {
                rebuilt.extend(chunk.text.chars().skip(DEFAULT_CHUNK_OVERLAP));
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn splitting_is_deterministic(text in "[a-z \n]{0,1500}") {
            let doc = Document::from_file("specs.txt", text);
            let fixed = FixedSizeChunker::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
            let recursive = RecursiveChunker::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
            prop_assert_eq!(fixed.chunk(&doc), fixed.chunk(&doc));
            prop_assert_eq!(recursive.chunk(&doc), recursive.chunk(&doc));
        }

        #[test]
        fn recursive_chunks_never_exceed_size(text in "[a-z]{1,12}( [a-z]{1,12}){0,300}") {
            let doc = Document::from_file("specs.txt", text);
            let chunks = RecursiveChunker::new(120, 20).chunk(&doc);
            prop_assert!(!chunks.is_empty());
            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() <= 120);
                prop_assert!(!chunk.text.is_empty());
            }
        }
    }
}
