
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::safety::DEFAULT_BLOCKED_PATTERNS;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const APP_DIR_NAME: &str = "health-rag";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Credential taken from the environment; never written back to disk
    #[serde(skip)]
    pub env_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_OLLAMA_PORT,
            model: "all-minilm".to_string(),
            batch_size: 16,
            embedding_dimension: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroqConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks placed into the model context
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChatConfig {
    pub max_response_tokens: u32,
    pub max_history_turns: usize,
    pub max_query_length: usize,
    pub max_display_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_response_tokens: 350,
            max_history_turns: 20,
            max_query_length: 2000,
            max_display_length: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SafetyConfig {
    pub blocked_patterns: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            blocked_patterns: DEFAULT_BLOCKED_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 8 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid chunk size: {0} (must be between 50 and 4096 characters)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidChunkOverlap { overlap: usize, size: usize },
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid max response tokens: {0} (must be between 1 and 8192)")]
    InvalidMaxTokens(u32),
    #[error("Invalid history limit: {0} (must be 200 or less)")]
    InvalidHistoryLimit(usize),
    #[error("Invalid max query length: {0} (must be between 1 and 100000)")]
    InvalidQueryLength(usize),
    #[error("Invalid max display length: {0} (must be at least 4)")]
    InvalidDisplayLength(usize),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid blocked pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("Invalid value for environment variable {key}: '{value}'")]
    InvalidEnvValue { key: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults, then apply
    /// environment overrides and validate.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let mut config = Self::load_file(config_dir)?;
        config
            .apply_env_overrides()
            .context("Failed to apply environment overrides")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load only what is on disk, ignoring the environment
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Default configuration directory for the current user
    #[inline]
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Empty values count as unset.
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(key) = get("GROQ_API_KEY") {
            self.env_api_key = Some(key);
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.ollama.set_url(&url)?;
        }
        if let Some(model) = get("GROQ_MODEL") {
            self.groq.model = model;
        }
        if let Some(value) = get("MAX_CONTEXT_DOCS") {
            self.retrieval.top_k = parse_env("MAX_CONTEXT_DOCS", &value)?;
        }
        if let Some(value) = get("MAX_RESPONSE_TOKENS") {
            self.chat.max_response_tokens = parse_env("MAX_RESPONSE_TOKENS", &value)?;
        }
        if let Some(value) = get("CHAT_HISTORY_LIMIT") {
            self.chat.max_history_turns = parse_env("CHAT_HISTORY_LIMIT", &value)?;
        }

        Ok(())
    }

    /// The model credential, preferring the environment over the config file
    #[inline]
    pub fn groq_api_key(&self) -> Option<String> {
        self.env_api_key
            .clone()
            .or_else(|| self.groq.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.groq.validate()?;
        self.validate_chunking_config()?;
        self.validate_chat_config()?;
        self.validate_safety_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(50..=4096).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidChunkOverlap {
                overlap: config.chunk_overlap,
                size: config.chunk_size,
            });
        }

        Ok(())
    }

    fn validate_chat_config(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.retrieval.top_k) {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        let chat = &self.chat;
        if !(1..=8192).contains(&chat.max_response_tokens) {
            return Err(ConfigError::InvalidMaxTokens(chat.max_response_tokens));
        }
        if chat.max_history_turns > 200 {
            return Err(ConfigError::InvalidHistoryLimit(chat.max_history_turns));
        }
        if !(1..=100_000).contains(&chat.max_query_length) {
            return Err(ConfigError::InvalidQueryLength(chat.max_query_length));
        }
        if chat.max_display_length < 4 {
            return Err(ConfigError::InvalidDisplayLength(chat.max_display_length));
        }

        Ok(())
    }

    fn validate_safety_config(&self) -> Result<(), ConfigError> {
        for pattern in &self.safety.blocked_patterns {
            fancy_regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Directory scanned by the build step
    #[inline]
    pub fn content_dir(&self) -> PathBuf {
        self.paths
            .content_dir
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("content"))
    }

    /// Directory holding the persisted vector index
    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.paths
            .index_dir
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("vector_store"))
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}://:{}",
                self.protocol, self.port
            )));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(8..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    /// Point at the Ollama server named by `url`, keeping the default port when none is given
    #[inline]
    pub fn set_url(&mut self, url: &str) -> Result<(), ConfigError> {
        let parsed = Url::parse(url.trim()).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
        let candidate = OllamaConfig {
            protocol: parsed.scheme().to_string(),
            host: parsed
                .host_str()
                .ok_or_else(|| ConfigError::InvalidUrl(url.to_string()))?
                .to_string(),
            port: parsed.port().unwrap_or(DEFAULT_OLLAMA_PORT),
            ..self.clone()
        };
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(8..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl GroqConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    /// Base URL guaranteed to end in `/` so relative joins keep the path prefix
    #[inline]
    pub fn endpoint_base(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).map_err(|_| ConfigError::InvalidUrl(base))
    }

    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    #[inline]
    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
    }
}
