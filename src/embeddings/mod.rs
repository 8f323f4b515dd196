// Embeddings module
// Text chunking plus the embedding models that turn chunks and questions into vectors

pub mod chunking;
pub mod ollama;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use chunking::{Chunk, ChunkingConfig, split_documents, split_text};
pub use ollama::OllamaEmbedder;

/// Identifies the embedding configuration an index was built with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingFingerprint {
    pub provider: String,
    pub model: String,
    pub dimension: u32,
}

impl fmt::Display for EmbeddingFingerprint {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}d)", self.provider, self.model, self.dimension)
    }
}

/// Maps text to fixed-dimension vectors.
///
/// The same embedder must be used to build an index and to query it; the
/// fingerprint is recorded at build time and checked when the index is opened.
pub trait Embedder: Send + Sync {
    fn fingerprint(&self) -> EmbeddingFingerprint;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    #[inline]
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
