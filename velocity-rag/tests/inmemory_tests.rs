//! Property tests for vector store search ordering.

use std::collections::HashMap;

use proptest::prelude::*;
use velocity_rag::document::Chunk;
use velocity_rag::inmemory::InMemoryVectorStore;
use velocity_rag::vectorstore::{CollectionInfo, VectorStore};

const DIM: usize = 16;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| Chunk {
            id,
            text,
            embedding,
            metadata: HashMap::from([("source".to_string(), "battlecard.txt".to_string())]),
            document_id: "battlecard.txt".to_string(),
        },
    )
}

fn dedupe(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut deduped: HashMap<String, Chunk> = HashMap::new();
    for chunk in chunks {
        deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
    }
    deduped.into_values().collect()
}

async fn search_all(
    store: &dyn VectorStore,
    chunks: &[Chunk],
    query: &[f32],
    top_k: usize,
) -> Vec<f32> {
    store.create_collection("test", &CollectionInfo::new(DIM, "prop")).await.unwrap();
    store.upsert("test", chunks).await.unwrap();
    store.search("test", query, top_k).await.unwrap().into_iter().map(|r| r.score).collect()
}

/// For any stored chunks, search returns at most `top_k` results ordered by
/// descending cosine similarity.
mod prop_search_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let unique_chunks = dedupe(&chunks);
            let unique_count = unique_chunks.len();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let memory_scores = rt.block_on(async {
                let memory = InMemoryVectorStore::new();
                search_all(&memory, &unique_chunks, &query, top_k).await
            });

            prop_assert!(memory_scores.len() <= top_k);
            prop_assert!(memory_scores.len() <= unique_count);
            prop_assert_eq!(memory_scores.len(), top_k.min(unique_count));

            for window in memory_scores.windows(2) {
                prop_assert!(
                    window[0] >= window[1],
                    "results not in descending order: {} < {}",
                    window[0],
                    window[1],
                );
            }
        }
    }
}

#[cfg(feature = "lancedb")]
#[tokio::test]
async fn lance_store_ranks_like_the_in_memory_store() {
    use proptest::strategy::ValueTree;
    use velocity_rag::LanceVectorStore;

    let mut runner = proptest::test_runner::TestRunner::deterministic();
    let chunks = proptest::collection::vec(arb_chunk(DIM), 12)
        .new_tree(&mut runner)
        .unwrap()
        .current();
    let chunks = dedupe(&chunks);
    let query = arb_normalized_embedding(DIM).new_tree(&mut runner).unwrap().current();

    let memory = InMemoryVectorStore::new();
    let temp = tempfile::tempdir().unwrap();
    let lance = LanceVectorStore::open(temp.path());
    let memory_scores = search_all(&memory, &chunks, &query, 5).await;
    let lance_scores = search_all(&lance, &chunks, &query, 5).await;

    assert_eq!(memory_scores.len(), lance_scores.len());
    for (m, l) in memory_scores.iter().zip(&lance_scores) {
        assert!((m - l).abs() < 1e-4, "in-memory {m} vs lance {l}");
    }
}

#[tokio::test]
async fn search_with_a_query_of_the_wrong_width_fails() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", &CollectionInfo::new(DIM, "prop")).await.unwrap();
    assert!(store.search("docs", &[1.0], 3).await.is_err());
    assert!(store.search("docs", &vec![1.0; DIM + 1], 3).await.is_err());
    assert!(store.search("docs", &vec![1.0; DIM], 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn upsert_into_missing_collection_fails() {
    let store = InMemoryVectorStore::new();
    let chunk = Chunk {
        id: "a".into(),
        text: "a".into(),
        embedding: vec![1.0; DIM],
        metadata: HashMap::new(),
        document_id: "d".into(),
    };
    assert!(store.upsert("missing", &[chunk]).await.is_err());
    assert!(store.count("missing").await.is_err());
}

#[tokio::test]
async fn create_collection_is_idempotent() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", &CollectionInfo::new(DIM, "first")).await.unwrap();
    store.create_collection("docs", &CollectionInfo::new(DIM, "second")).await.unwrap();
    let info = store.collection_info("docs").await.unwrap().unwrap();
    assert_eq!(info.embedding_model, "first");
}
