// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::{Chunk, ChunkingConfig, EmbeddingFingerprint};
use crate::{RagError, Result};

/// Name of the LanceDB table holding chunk rows
pub const CHUNKS_TABLE: &str = "chunks";
/// Written last during a build, so its presence marks a complete index
pub const MANIFEST_FILE: &str = "manifest.json";

/// A chunk paired with its embedding, as stored in LanceDB
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Describes how an index on disk was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding: EmbeddingFingerprint,
    pub chunk_count: usize,
    pub chunking: ChunkingConfig,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn new(embedding: EmbeddingFingerprint, chunk_count: usize, chunking: ChunkingConfig) -> Self {
        Self {
            embedding,
            chunk_count,
            chunking,
            built_at: Utc::now(),
        }
    }

    /// Read the manifest from an index directory, `None` when it is absent
    #[inline]
    pub fn read(index_dir: &Path) -> Result<Option<Self>> {
        let path = index_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            debug!("No index manifest at {}", path.display());
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&raw).map_err(|e| {
            RagError::Database(format!(
                "Index manifest at {} is unreadable: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(manifest))
    }

    #[inline]
    pub fn write(&self, index_dir: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Database(format!("Failed to serialize manifest: {}", e)))?;
        fs::write(index_dir.join(MANIFEST_FILE), raw)?;
        Ok(())
    }
}
