
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{Embedder, EmbeddingFingerprint};
use crate::config::Config;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const PROVIDER: &str = "ollama";

/// Embedding client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| RagError::Config(format!("Invalid Ollama configuration: {}", e)))?;

        Ok(Self {
            base_url,
            model: config.ollama.model.clone(),
            batch_size: config.ollama.batch_size.max(1),
            dimension: config.ollama.embedding_dimension,
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// Check the server is reachable and the configured model is installed
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        if models.iter().any(|m| self.matches_model(&m.name)) {
            info!(
                "Health check passed for Ollama server at {} with model {}",
                self.base_url, self.model
            );
            Ok(())
        } else {
            let available = models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available
            );
            Err(RagError::Embedding(format!(
                "Model '{}' is not installed. Run `ollama pull {}`. Available models: {:?}",
                self.model, self.model, available
            )))
        }
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("api/tags")?;
        debug!("Pinging Ollama server at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("ping Ollama server", &e))?;

        debug!("Server ping successful");
        Ok(())
    }

    /// List the models installed on the server
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("list Ollama models", &e))?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn matches_model(&self, name: &str) -> bool {
        name == self.model
            || name
                .strip_suffix(":latest")
                .is_some_and(|base| base == self.model)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::Embedding(format!("Failed to build Ollama URL: {}", e)))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("api/embed")?;
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("generate embeddings", &e))?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        for embedding in &response.embeddings {
            if embedding.len() != self.dimension as usize {
                return Err(RagError::Embedding(format!(
                    "Model '{}' returned {} dimensions but {} are configured",
                    self.model,
                    embedding.len(),
                    self.dimension
                )));
            }
        }

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn fingerprint(&self) -> EmbeddingFingerprint {
        EmbeddingFingerprint {
            provider: PROVIDER.to_string(),
            model: self.model.clone(),
            dimension: self.dimension,
        }
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Embedding("Empty embedding response".to_string()))
    }

    /// Embed texts in batches of the configured size
    #[inline]
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_batch(batch)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Failures are reported once; callers decide whether to try again
fn request_error(action: &str, error: &ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(status) => {
            warn!("Ollama returned HTTP {} while trying to {}", status, action);
            RagError::Embedding(format!("Failed to {}: HTTP {}", action, status))
        }
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            warn!("Could not connect to Ollama while trying to {}", action);
            RagError::Embedding(format!(
                "Failed to {}: could not connect to Ollama. Is `ollama serve` running?",
                action
            ))
        }
        other => {
            warn!("Transport error while trying to {}: {}", action, other);
            RagError::Embedding(format!("Failed to {}: {}", action, other))
        }
    }
}
