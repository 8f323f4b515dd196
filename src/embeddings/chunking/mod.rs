
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ingest::{Document, DocumentMetadata};

/// Split points in order of preference: paragraph, line, sentence, word, character
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// A bounded fragment of a source document, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Position of this chunk within its parent document
    pub chunk_index: u32,
}

/// Configuration for document chunking. Sizes are measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Maximum length of the tail carried from one chunk into the next
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 50,
        }
    }
}

/// Split every document into chunks that inherit its metadata
#[inline]
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks = documents
        .iter()
        .flat_map(|document| {
            split_text(&document.text, config)
                .into_iter()
                .zip(0_u32..)
                .map(|(text, chunk_index)| Chunk {
                    id: chunk_id(&document.metadata, chunk_index, &text),
                    text,
                    metadata: document.metadata.clone(),
                    chunk_index,
                })
        })
        .collect::<Vec<_>>();

    info!(
        "Split {} document(s) into {} chunks",
        documents.len(),
        chunks.len()
    );
    chunks
}

/// Split text into trimmed, non-empty chunks of at most `chunk_size` characters
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunks = split_recursive(text, SEPARATORS, config);
    debug!(
        "Split text of {} characters into {} chunks",
        char_len(text),
        chunks.len()
    );
    chunks
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|separator| separator.is_empty() || text.contains(separator))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let pieces = split_keeping_separator(text, separator);

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    for piece in pieces {
        if char_len(piece) <= config.chunk_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, config));
            pending.clear();
        }

        if remaining.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, config));
    }

    chunks
}

/// Split on `separator`, leaving it attached to the end of the preceding piece.
/// An empty separator splits between characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.split_inclusive(|_: char| true).collect()
    } else {
        text.split_inclusive(separator).collect()
    }
}

/// Greedily combine pieces up to `chunk_size`, carrying a short tail forward as overlap
fn merge_pieces(pieces: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0_usize;

    for &piece in pieces {
        let length = char_len(piece);

        if total + length > config.chunk_size && !window.is_empty() {
            push_window(&window, &mut chunks);

            while total > config.chunk_overlap
                || (total + length > config.chunk_size && total > 0)
            {
                match window.pop_front() {
                    Some((_, dropped)) => total -= dropped,
                    None => break,
                }
            }
        }

        window.push_back((piece, length));
        total += length;
    }

    push_window(&window, &mut chunks);
    chunks
}

fn push_window(window: &VecDeque<(&str, usize)>, chunks: &mut Vec<String>) {
    let joined = window.iter().map(|(piece, _)| *piece).collect::<String>();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn chunk_id(metadata: &DocumentMetadata, chunk_index: u32, text: &str) -> Uuid {
    let name = format!(
        "{}\u{1f}{}\u{1f}{}",
        metadata.source_path.display(),
        chunk_index,
        text
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
