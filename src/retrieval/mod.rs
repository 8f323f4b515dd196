#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::database::{SearchResult, VectorIndex};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Fixed top-k lookup over the vector index.
///
/// The index is loaded once and reused for every request. When no index was
/// found at startup each request fails with [`RagError::IndexUnavailable`].
pub struct Retriever {
    embedder: Box<dyn Embedder>,
    index: Option<VectorIndex>,
    index_path: PathBuf,
    top_k: usize,
}

impl std::fmt::Debug for Retriever {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.index)
            .field("index_path", &self.index_path)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Box<dyn Embedder>, index: VectorIndex, top_k: usize) -> Self {
        Self {
            embedder,
            index_path: index.path().to_path_buf(),
            index: Some(index),
            top_k,
        }
    }

    /// Open the index at `index_path`, holding it as unavailable if it was never built
    #[inline]
    pub async fn open(index_path: &Path, embedder: Box<dyn Embedder>, top_k: usize) -> Result<Self> {
        let index = match VectorIndex::open(index_path, &embedder.fingerprint()).await {
            Ok(index) => Some(index),
            Err(RagError::IndexUnavailable { path }) => {
                warn!(
                    "No vector index at {}; questions will be refused until it is built",
                    path.display()
                );
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            embedder,
            index,
            index_path: index_path.to_path_buf(),
            top_k,
        })
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The `top_k` chunks most similar to `query`
    #[inline]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let Some(index) = self.index.as_ref() else {
            return Err(RagError::IndexUnavailable {
                path: self.index_path.clone(),
            });
        };

        let query_vector = self.embedder.embed(query)?;
        let results = index.search(&query_vector, self.top_k).await?;
        debug!(
            "Retrieved {} chunks (best score {:?})",
            results.len(),
            results.first().map(|r| r.score)
        );
        Ok(results)
    }

    /// Retrieved chunk texts joined in similarity order
    #[inline]
    pub async fn retrieve_context(&self, query: &str) -> Result<String> {
        let results = self.retrieve(query).await?;
        Ok(format_context(&results))
    }
}

/// Join chunk texts with blank lines; overlapping chunks are not deduplicated
#[inline]
pub fn format_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).join("\n\n")
}
