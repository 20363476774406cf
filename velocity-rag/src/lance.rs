//! LanceDB-backed vector store.
//!
//! [`LanceVectorStore`] keeps each collection as a Lance table of chunks under
//! its root directory (`<root>/<collection>.lance`). A `_collections` table
//! alongside records the embedding model and vector width every collection
//! was created with, so an empty collection still knows what it expects.
//!
//! Search is an exact cosine scan; the collections this crate builds are
//! small enough that no ANN index is created.
//!
//! # Example
//!
//! ```rust,ignore
//! use velocity_rag::{CollectionInfo, LanceVectorStore, VectorStore};
//!
//! let store = LanceVectorStore::open("./chroma_db");
//! store.create_collection("docs", &CollectionInfo::new(384, "all-MiniLM-L6-v2")).await?;
//! store.upsert("docs", &chunks).await?;
//! let hits = store.search("docs", &query_embedding, 3).await?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table, connect};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{
    CollectionInfo, VectorStore, check_query_width, missing_collection, wrong_width,
};

const BACKEND: &str = "LanceDB";

/// Table recording each collection's [`CollectionInfo`].
const REGISTRY_TABLE: &str = "_collections";

fn lance_error(action: &str, cause: impl Display) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("{action}: {cause}"),
    }
}

/// Quote `value` as a SQL string literal for a Lance filter.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn id_list<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter().map(quoted).collect::<Vec<_>>().join(", ")
}

fn registry_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("collection", DataType::Utf8, false),
        Field::new("dimensions", DataType::UInt32, false),
        Field::new("embedding_model", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn vector_width(dimensions: usize) -> Result<i32> {
    i32::try_from(dimensions)
        .map_err(|_| lance_error("create collection", format!("{dimensions} dimensions")))
}

fn chunk_schema(dimensions: usize) -> Result<SchemaRef> {
    let item = Arc::new(Field::new("item", DataType::Float32, true));
    Ok(Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("document_id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(item, vector_width(dimensions)?), false),
    ])))
}

fn registry_batch(name: &str, info: &CollectionInfo) -> Result<RecordBatch> {
    let dimensions = u32::try_from(info.dimensions)
        .map_err(|_| lance_error("create collection", format!("{} dimensions", info.dimensions)))?;
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![name])),
        Arc::new(UInt32Array::from(vec![dimensions])),
        Arc::new(StringArray::from(vec![info.embedding_model.as_str()])),
        Arc::new(StringArray::from(vec![info.created_at.to_rfc3339()])),
    ];
    RecordBatch::try_new(registry_schema(), columns).map_err(|e| lance_error("build batch", e))
}

fn chunks_batch(chunks: &[&Chunk], dimensions: usize) -> Result<RecordBatch> {
    let mut vectors = FixedSizeListBuilder::new(Float32Builder::new(), vector_width(dimensions)?);
    for chunk in chunks {
        vectors.values().append_slice(&chunk.embedding);
        vectors.append(true);
    }
    let metadata = chunks
        .iter()
        .map(|c| serde_json::to_string(&c.metadata))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
        Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.document_id.as_str()))),
        Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
        Arc::new(StringArray::from(metadata)),
        Arc::new(vectors.finish()),
    ];
    RecordBatch::try_new(chunk_schema(dimensions)?, columns)
        .map_err(|e| lance_error("build batch", e))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| lance_error("read batch", format!("missing or mistyped column '{name}'")))
}

fn info_from_batch(batch: &RecordBatch, row: usize) -> Result<CollectionInfo> {
    let dimensions = column::<UInt32Array>(batch, "dimensions")?.value(row);
    let model = column::<StringArray>(batch, "embedding_model")?.value(row);
    let created_at = column::<StringArray>(batch, "created_at")?.value(row);
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| lance_error("read collection info", e))?
        .with_timezone(&Utc);
    Ok(CollectionInfo {
        dimensions: dimensions as usize,
        embedding_model: model.to_string(),
        created_at,
    })
}

/// Decode chunk rows, paired with `_distance` when the batch came from a vector search.
fn chunks_from_batch(batch: &RecordBatch) -> Result<Vec<(Chunk, Option<f32>)>> {
    let ids = column::<StringArray>(batch, "chunk_id")?;
    let document_ids = column::<StringArray>(batch, "document_id")?;
    let texts = column::<StringArray>(batch, "text")?;
    let metadata = column::<StringArray>(batch, "metadata")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;
    let distances = column::<Float32Array>(batch, "_distance").ok();

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let embedding = vectors.value(row);
        let embedding = embedding
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|values| values.values().to_vec())
            .unwrap_or_default();
        let metadata: HashMap<String, String> = serde_json::from_str(metadata.value(row))?;
        let chunk = Chunk {
            id: ids.value(row).to_string(),
            text: texts.value(row).to_string(),
            embedding,
            metadata,
            document_id: document_ids.value(row).to_string(),
        };
        rows.push((chunk, distances.map(|d| d.value(row))));
    }
    Ok(rows)
}

async fn append(table: &Table, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
    table.add(Box::new(batches)).execute().await.map_err(|e| lance_error("write rows", e))?;
    Ok(())
}

/// A [`VectorStore`] persisted in a LanceDB directory.
pub struct LanceVectorStore {
    root: PathBuf,
    connection: RwLock<Option<Connection>>,
}

impl LanceVectorStore {
    /// Open a store rooted at `root`.
    ///
    /// Nothing is read or created until a collection is accessed.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), connection: RwLock::new(None) }
    }

    /// The directory holding the Lance tables.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn connection(&self) -> Result<Connection> {
        if let Some(connection) = self.connection.read().await.as_ref() {
            return Ok(connection.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }
        let uri = self.root.to_string_lossy();
        let connection = connect(&uri).execute().await.map_err(|e| lance_error("connect", e))?;
        debug!(path = %self.root.display(), "connected to LanceDB");
        *slot = Some(connection.clone());
        Ok(connection)
    }

    async fn table_exists(&self, connection: &Connection, name: &str) -> Result<bool> {
        let names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| lance_error("list tables", e))?;
        Ok(names.iter().any(|n| n == name))
    }

    async fn open_table(&self, connection: &Connection, name: &str) -> Result<Table> {
        connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| lance_error(&format!("open table '{name}'"), e))
    }

    /// The registry table, created on first use when `create` is set.
    async fn registry(&self, create: bool) -> Result<Option<Table>> {
        let connection = self.connection().await?;
        if self.table_exists(&connection, REGISTRY_TABLE).await? {
            return self.open_table(&connection, REGISTRY_TABLE).await.map(Some);
        }
        if !create {
            return Ok(None);
        }
        let table = connection
            .create_empty_table(REGISTRY_TABLE, registry_schema())
            .execute()
            .await
            .map_err(|e| lance_error("create registry", e))?;
        Ok(Some(table))
    }

    fn validate_name(name: &str) -> Result<()> {
        let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            return Ok(());
        }
        Err(RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!(
                "invalid collection name '{name}': start with a letter or digit, \
                 then use ASCII letters, digits, '_' or '-'"
            ),
        })
    }

    async fn read_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Self::validate_name(name)?;
        let Some(registry) = self.registry(false).await? else {
            return Ok(None);
        };
        let batches: Vec<RecordBatch> = registry
            .query()
            .only_if(format!("collection = {}", quoted(name)))
            .execute()
            .await
            .map_err(|e| lance_error("query registry", e))?
            .try_collect()
            .await
            .map_err(|e| lance_error("read registry", e))?;

        match batches.iter().find(|b| b.num_rows() > 0) {
            Some(batch) => info_from_batch(batch, 0).map(Some),
            None => Ok(None),
        }
    }

    /// The collection's info and chunk table, or an error if it does not exist.
    async fn existing(&self, name: &str) -> Result<(CollectionInfo, Table)> {
        let info = self.read_info(name).await?.ok_or_else(|| missing_collection(BACKEND, name))?;
        let connection = self.connection().await?;
        let table = self.open_table(&connection, name).await?;
        Ok((info, table))
    }

    async fn scan(&self, table: &Table) -> Result<Vec<RecordBatch>> {
        table
            .query()
            .execute()
            .await
            .map_err(|e| lance_error("scan", e))?
            .try_collect()
            .await
            .map_err(|e| lance_error("scan", e))
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn create_collection(&self, name: &str, info: &CollectionInfo) -> Result<()> {
        if self.read_info(name).await?.is_some() {
            debug!(collection = name, "collection already exists, skipping creation");
            return Ok(());
        }

        let connection = self.connection().await?;
        // A chunk table without a registry row is left over from an interrupted create.
        if self.table_exists(&connection, name).await? {
            connection.drop_table(name).await.map_err(|e| lance_error("drop stale table", e))?;
        }
        connection
            .create_empty_table(name, chunk_schema(info.dimensions)?)
            .execute()
            .await
            .map_err(|e| lance_error(&format!("create table '{name}'"), e))?;

        let registry = self
            .registry(true)
            .await?
            .ok_or_else(|| lance_error("create registry", "table missing after creation"))?;
        append(&registry, registry_batch(name, info)?).await?;

        info!(
            collection = name,
            dimensions = info.dimensions,
            path = %self.root.display(),
            "created collection"
        );
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        self.read_info(name).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        let connection = self.connection().await?;
        if self.table_exists(&connection, name).await? {
            connection.drop_table(name).await.map_err(|e| lance_error("drop table", e))?;
        }
        if let Some(registry) = self.registry(false).await? {
            registry
                .delete(&format!("collection = {}", quoted(name)))
                .await
                .map_err(|e| lance_error("delete registry row", e))?;
        }
        debug!(collection = name, "deleted collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let (info, table) = self.existing(collection).await?;
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != info.dimensions) {
            return Err(wrong_width(BACKEND, &bad.id, bad.embedding.len(), info.dimensions));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        // Later duplicates win, as repeated upserts would.
        let latest: BTreeMap<&str, &Chunk> = chunks.iter().map(|c| (c.id.as_str(), c)).collect();
        let rows: Vec<&Chunk> = latest.into_values().collect();
        let batch = chunks_batch(&rows, info.dimensions)?;

        table
            .delete(&format!("chunk_id IN ({})", id_list(rows.iter().map(|c| c.id.as_str()))))
            .await
            .map_err(|e| lance_error("replace rows", e))?;
        append(&table, batch).await?;

        debug!(collection, chunk_count = rows.len(), "upserted chunks");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let (_, table) = self.existing(collection).await?;
        if ids.is_empty() {
            return Ok(());
        }
        table
            .delete(&format!("chunk_id IN ({})", id_list(ids.iter().copied())))
            .await
            .map_err(|e| lance_error("delete rows", e))?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let (_, table) = self.existing(collection).await?;
        let batches = self.scan(&table).await?;
        Ok(batches.iter().map(RecordBatch::num_rows).sum())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let (info, table) = self.existing(collection).await?;
        check_query_width(BACKEND, embedding.len(), info.dimensions)?;

        let stored: usize = self.scan(&table).await?.iter().map(RecordBatch::num_rows).sum();
        let limit = top_k.min(stored);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = table
            .vector_search(embedding.to_vec())
            .map_err(|e| lance_error("build search", e))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| lance_error("search", e))?
            .try_collect()
            .await
            .map_err(|e| lance_error("read search results", e))?;

        let mut results = Vec::with_capacity(limit);
        for batch in &batches {
            for (chunk, distance) in chunks_from_batch(batch)? {
                // Cosine distance is 1 - similarity.
                let score = distance.map_or(0.0, |d| 1.0 - d);
                results.push(SearchResult { chunk, score });
            }
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::from([("source".to_string(), "battlecard.txt".to_string())]),
            document_id: "battlecard.txt".to_string(),
        }
    }

    async fn store_with(root: &Path, chunks: &[Chunk]) -> LanceVectorStore {
        let store = LanceVectorStore::open(root);
        store.create_collection("docs", &CollectionInfo::new(2, "hash-2")).await.unwrap();
        store.upsert("docs", chunks).await.unwrap();
        store
    }

    #[tokio::test]
    async fn collections_survive_reopening() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("db");
        let store =
            store_with(&root, &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])]).await;
        let before = store.search("docs", &[1.0, 0.1], 2).await.unwrap();

        let reopened = LanceVectorStore::open(&root);
        let info = reopened.collection_info("docs").await.unwrap().unwrap();
        assert_eq!(info.embedding_model, "hash-2");
        assert_eq!(info.dimensions, 2);
        assert_eq!(reopened.count("docs").await.unwrap(), 2);

        let after = reopened.search("docs", &[1.0, 0.1], 2).await.unwrap();
        let ids = |results: &[SearchResult]| {
            results.iter().map(|r| r.chunk.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&before), ["a", "b"]);
        assert_eq!(ids(&before), ids(&after));
        assert_eq!(after[0].chunk.source(), Some("battlecard.txt"));
        assert_eq!(after[0].chunk.embedding, [1.0, 0.0]);
        assert!(root.join("docs.lance").is_dir());
    }

    #[tokio::test]
    async fn scores_are_cosine_similarities() {
        let temp = tempfile::tempdir().unwrap();
        let chunks = [chunk("same", vec![2.0, 0.0]), chunk("opposite", vec![-1.0, 0.0])];
        let store = store_with(temp.path(), &chunks).await;

        let results = store.search("docs", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "same");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!((results[1].score + 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn upserting_an_existing_id_replaces_it() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with(temp.path(), &[chunk("a", vec![1.0, 0.0])]).await;
        let mut replacement = chunk("a", vec![0.0, 1.0]);
        replacement.text = "rewritten".to_string();
        store.upsert("docs", &[replacement]).await.unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 1);
        let results = store.search("docs", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.text, "rewritten");
    }

    #[tokio::test]
    async fn rejected_upsert_leaves_the_collection_unchanged() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with(temp.path(), &[chunk("a", vec![1.0, 0.0])]).await;

        let err = store.upsert("docs", &[chunk("b", vec![1.0, 0.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert_eq!(store.count("docs").await.unwrap(), 1);
        assert_eq!(LanceVectorStore::open(temp.path()).count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_of_the_wrong_width_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with(temp.path(), &[chunk("a", vec![1.0, 0.0])]).await;
        let err = store.search("docs", &[1.0], 3).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn missing_collection_reads_as_none() {
        let temp = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::open(temp.path().join("never-created"));
        assert!(store.collection_info("docs").await.unwrap().is_none());
        assert!(store.search("docs", &[1.0], 3).await.is_err());
        assert!(store.count("docs").await.is_err());
    }

    #[tokio::test]
    async fn delete_collection_drops_table_and_info() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with(temp.path(), &[chunk("a", vec![1.0, 0.0])]).await;

        store.delete_collection("docs").await.unwrap();
        assert!(store.collection_info("docs").await.unwrap().is_none());
        assert!(!temp.path().join("docs.lance").exists());
        store.delete_collection("docs").await.unwrap();

        store.create_collection("docs", &CollectionInfo::new(3, "hash-3")).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 0);
        assert_eq!(store.collection_info("docs").await.unwrap().unwrap().dimensions, 3);
    }

    #[tokio::test]
    async fn deleted_chunks_stay_deleted_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let store =
            store_with(temp.path(), &[chunk("a", vec![1.0, 0.0]), chunk("it's", vec![0.0, 1.0])])
                .await;
        store.delete("docs", &["it's"]).await.unwrap();

        let reopened = LanceVectorStore::open(temp.path());
        assert_eq!(reopened.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn names_that_are_not_plain_identifiers_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::open(temp.path());
        for name in ["../escape", "_collections", ""] {
            let result = store.create_collection(name, &CollectionInfo::new(1, "m")).await;
            assert!(matches!(result, Err(RagError::VectorStoreError { .. })), "{name}");
        }
    }
}
