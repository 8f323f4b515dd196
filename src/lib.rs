use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Vector index not found at {}", path.display())]
    IndexUnavailable { path: PathBuf },

    #[error("{0}")]
    Config(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("No documents to index. Add .json, .txt or .md files to the content directory and run again.")]
    EmptyCorpus,

    #[error(
        "Index was built with embeddings '{built}' but the current embedder is '{current}'. Rebuild the index."
    )]
    EmbeddingMismatch { built: String, current: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chatbot;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod ingest;
pub mod retrieval;
pub mod safety;

#[cfg(test)]
pub(crate) mod test_support;
