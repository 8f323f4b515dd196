
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CHUNKS_TABLE, EmbeddingRecord, IndexManifest};
use crate::embeddings::{Chunk, ChunkingConfig, Embedder, EmbeddingFingerprint};
use crate::ingest::DocumentMetadata;
use crate::{RagError, Result};

/// Persisted nearest-neighbour index over chunk embeddings
pub struct VectorIndex {
    table: Table,
    path: PathBuf,
    manifest: IndexManifest,
}

/// A stored chunk and its cosine similarity to the query (higher is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

impl std::fmt::Debug for VectorIndex {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("path", &self.path)
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Whether a completed index is present at `path`
    #[inline]
    pub fn exists(path: &Path) -> bool {
        path.join(super::MANIFEST_FILE).is_file()
    }

    /// Embed `chunks` and write a fresh index at `path`, replacing any previous one.
    ///
    /// Fails with [`RagError::EmptyCorpus`] rather than writing an empty index.
    #[inline]
    pub async fn build(
        path: &Path,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        chunking: ChunkingConfig,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let fingerprint = embedder.fingerprint();
        info!(
            "Building vector index at {} from {} chunks with {}",
            path.display(),
            chunks.len(),
            fingerprint
        );

        let texts = chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
        let vectors = embedder.embed_many(&texts)?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings but received {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records = chunks
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord { chunk, vector })
            .collect::<Vec<_>>();

        if path.exists() {
            debug!("Removing previous index at {}", path.display());
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;

        let connection = connect(path).await?;
        let dimension = fingerprint.dimension as usize;
        let schema = create_schema(dimension);
        let table = connection
            .create_empty_table(CHUNKS_TABLE, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

        let record_batch = create_record_batch(&records, dimension, schema)?;
        let batch_schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), batch_schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert embeddings: {}", e)))?;

        let manifest = IndexManifest::new(fingerprint, records.len(), chunking);
        manifest.write(path)?;

        info!("Stored {} embeddings in {}", records.len(), path.display());
        Ok(Self {
            table,
            path: path.to_path_buf(),
            manifest,
        })
    }

    /// Open an existing index for querying.
    ///
    /// A missing index is reported as [`RagError::IndexUnavailable`]; an index
    /// built with a different embedder is refused.
    #[inline]
    pub async fn open(path: &Path, expected: &EmbeddingFingerprint) -> Result<Self> {
        let unavailable = || RagError::IndexUnavailable {
            path: path.to_path_buf(),
        };

        let manifest = IndexManifest::read(path)?.ok_or_else(unavailable)?;
        if manifest.embedding != *expected {
            warn!(
                "Index at {} was built with {} but the current embedder is {}",
                path.display(),
                manifest.embedding,
                expected
            );
            return Err(RagError::EmbeddingMismatch {
                built: manifest.embedding.to_string(),
                current: expected.to_string(),
            });
        }

        let connection = connect(path).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;
        if !table_names.iter().any(|name| name == CHUNKS_TABLE) {
            warn!("Index manifest found but chunk table is missing");
            return Err(unavailable());
        }

        let table = connection
            .open_table(CHUNKS_TABLE)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

        debug!(
            "Opened vector index at {} ({} chunks)",
            path.display(),
            manifest.chunk_count
        );
        Ok(Self {
            table,
            path: path.to_path_buf(),
            manifest,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.manifest.embedding.dimension as usize
    }

    /// Return at most `k` chunks nearest to `query_vector`, most similar first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query_vector.len() != self.dimension() {
            return Err(RagError::Embedding(format!(
                "Query vector has {} dimensions but the index expects {}",
                query_vector.len(),
                self.dimension()
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching for similar vectors with limit: {}", k);

        let stream = self
            .table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let batches = stream
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?;

        let mut results = Vec::new();
        for batch in &batches {
            results.extend(parse_search_batch(batch)?);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        debug!("Found {} search results", results.len());
        Ok(results)
    }

    /// Number of chunk rows stored in the table
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }
}

async fn connect(path: &Path) -> Result<Connection> {
    let uri = format!("file://{}", path.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("source_path", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, true),
        Field::new("chunk_index", DataType::UInt32, false),
    ]))
}

fn create_record_batch(
    records: &[EmbeddingRecord],
    vector_dim: usize,
    schema: Arc<Schema>,
) -> Result<RecordBatch> {
    let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
    for record in records {
        if record.vector.len() != vector_dim {
            return Err(RagError::Embedding(format!(
                "Embedding for chunk {} has {} dimensions, expected {}",
                record.chunk.id,
                record.vector.len(),
                vector_dim
            )));
        }
        flat_values.extend_from_slice(&record.vector);
    }

    let ids = records
        .iter()
        .map(|r| r.chunk.id.to_string())
        .collect::<Vec<_>>();
    let texts = records
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>();
    let sources = records
        .iter()
        .map(|r| r.chunk.metadata.source_path.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    let categories = records
        .iter()
        .map(|r| r.chunk.metadata.category.as_deref())
        .collect::<Vec<_>>();
    let chunk_indices = records
        .iter()
        .map(|r| r.chunk.chunk_index)
        .collect::<Vec<_>>();

    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(sources)),
        Arc::new(StringArray::from(categories)),
        Arc::new(UInt32Array::from(chunk_indices)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = typed_column::<StringArray>(batch, "id")?;
    let texts = typed_column::<StringArray>(batch, "text")?;
    let sources = typed_column::<StringArray>(batch, "source_path")?;
    let categories = typed_column::<StringArray>(batch, "category")?;
    let chunk_indices = typed_column::<UInt32Array>(batch, "chunk_index")?;
    let distances = typed_column::<Float32Array>(batch, "_distance")?;

    (0..batch.num_rows())
        .map(|row| {
            let id = Uuid::parse_str(ids.value(row))
                .map_err(|e| RagError::Database(format!("Invalid chunk id: {}", e)))?;
            let category = if categories.is_null(row) {
                None
            } else {
                Some(categories.value(row).to_string())
            };
            let distance = if distances.is_null(row) {
                1.0
            } else {
                distances.value(row)
            };

            Ok(SearchResult {
                chunk: Chunk {
                    id,
                    text: texts.value(row).to_string(),
                    metadata: DocumentMetadata {
                        source_path: PathBuf::from(sources.value(row)),
                        category,
                    },
                    chunk_index: chunk_indices.value(row),
                },
                score: 1.0 - distance,
            })
        })
        .collect()
}
