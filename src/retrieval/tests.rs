use super::*;
use crate::embeddings::ChunkingConfig;
use crate::test_support::{HashEmbedder, chunk, health_chunks};
use tempfile::TempDir;

async fn built_retriever(temp_dir: &TempDir, top_k: usize) -> Retriever {
    let path = temp_dir.path().join("index");
    VectorIndex::build(
        &path,
        &health_chunks(),
        &HashEmbedder::new(),
        ChunkingConfig::default(),
    )
    .await
    .expect("index builds");

    Retriever::open(&path, Box::new(HashEmbedder::new()), top_k)
        .await
        .expect("retriever opens")
}

#[test]
fn context_joins_chunks_with_blank_lines() {
    let results = vec![
        SearchResult {
            chunk: chunk("a.txt", 0, "First passage."),
            score: 0.9,
        },
        SearchResult {
            chunk: chunk("b.txt", 0, "Second passage."),
            score: 0.5,
        },
    ];
    assert_eq!(format_context(&results), "First passage.\n\nSecond passage.");
    assert_eq!(format_context(&[]), "");
}

#[tokio::test]
async fn retrieve_respects_top_k() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = built_retriever(&temp_dir, 2).await;

    assert!(retriever.is_available());
    let results = retriever
        .retrieve("What are flu symptoms?")
        .await
        .expect("retrieval succeeds");
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].chunk.text,
        "Flu symptoms include fever, cough, fatigue"
    );
}

#[tokio::test]
async fn context_starts_with_best_match() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = built_retriever(&temp_dir, 4).await;

    let context = retriever
        .retrieve_context("signs of dehydration and dark urine")
        .await
        .expect("retrieval succeeds");

    assert!(context.starts_with("Adults should drink water regularly"));
    assert_eq!(context.split("\n\n").count(), 4);
}

#[tokio::test]
async fn missing_index_is_held_as_unavailable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("missing");

    let retriever = Retriever::open(&path, Box::new(HashEmbedder::new()), 4)
        .await
        .expect("open tolerates a missing index");

    assert!(!retriever.is_available());
    let result = retriever.retrieve("anything").await;
    assert!(matches!(result, Err(RagError::IndexUnavailable { .. })));
}

#[tokio::test]
async fn mismatched_embedder_fails_to_open() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = built_retriever(&temp_dir, 4).await.index_path.clone();

    let result = Retriever::open(&path, Box::new(HashEmbedder::with_model("other")), 4).await;
    assert!(matches!(result, Err(RagError::EmbeddingMismatch { .. })));
}
