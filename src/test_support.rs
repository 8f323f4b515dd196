//! Deterministic stand-ins for the embedding and answer models used in unit tests

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::embeddings::{Chunk, Embedder, EmbeddingFingerprint};
use crate::generation::{ChatModel, CompletionRequest};
use crate::ingest::DocumentMetadata;
use crate::{RagError, Result};

pub(crate) const TEST_DIMENSION: u32 = 64;

/// Bag-of-words embedder: texts sharing words land close together
#[derive(Debug, Clone)]
pub(crate) struct HashEmbedder {
    dimension: u32,
    model: String,
}

impl HashEmbedder {
    pub(crate) fn new() -> Self {
        Self {
            dimension: TEST_DIMENSION,
            model: "bag-of-words".to_string(),
        }
    }

    pub(crate) fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::new()
        }
    }
}

impl Embedder for HashEmbedder {
    fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: "test".to_string(),
            model: self.model.clone(),
            dimension: self.dimension,
        }
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dimension = self.dimension as usize;
        let mut vector = vec![0.0_f32; dimension];
        // Constant component keeps every vector non-zero
        vector[0] = 0.1;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let bucket = 1 + (fnv1a(&word.to_lowercase()) as usize % (dimension - 1));
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        Ok(vector.into_iter().map(|v| v / norm).collect())
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Answer model that returns a fixed reply and records every request
#[derive(Debug, Clone)]
pub(crate) struct ScriptedModel {
    reply: std::result::Result<String, String>,
    pub(crate) requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedModel {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn recorded(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock is not poisoned").clone()
    }
}

impl ChatModel for ScriptedModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("lock is not poisoned")
            .push(request.clone());
        self.reply.clone().map_err(RagError::Generation)
    }
}

pub(crate) fn chunk(source: &str, index: u32, text: &str) -> Chunk {
    Chunk {
        id: uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, format!("{source}{index}").as_bytes()),
        text: text.to_string(),
        metadata: DocumentMetadata {
            source_path: PathBuf::from(source),
            category: Some("general".to_string()),
        },
        chunk_index: index,
    }
}

pub(crate) fn health_chunks() -> Vec<Chunk> {
    vec![
        chunk("faq.json", 0, "Flu symptoms include fever, cough, fatigue"),
        chunk(
            "hydration.md",
            0,
            "Adults should drink water regularly; thirst and dark urine are signs of dehydration",
        ),
        chunk(
            "headache.txt",
            0,
            "See a doctor for a headache that is sudden, severe or follows an injury",
        ),
        chunk(
            "sleep.md",
            0,
            "Most adults need seven to nine hours of sleep each night",
        ),
        chunk(
            "handwashing.md",
            0,
            "Washing hands with soap helps stop the spread of flu and colds",
        ),
    ]
}
