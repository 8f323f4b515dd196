
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ChatMessage, ChatModel, CompletionRequest};
use crate::config::{Config, GroqConfig};
use crate::{RagError, Result};

pub const MISSING_API_KEY_MESSAGE: &str =
    "GROQ_API_KEY is not set. Add it to your environment or config.toml.";

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct GroqClient {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl GroqClient {
    /// A missing key is not an error here; it is reported on the first request
    #[inline]
    pub fn new(config: &GroqConfig, api_key: Option<String>) -> Result<Self> {
        let endpoint = config
            .endpoint_base()
            .and_then(|base| {
                base.join("chat/completions")
                    .map_err(|e| crate::config::ConfigError::InvalidUrl(e.to_string()))
            })
            .map_err(|e| RagError::Config(format!("Invalid answer model endpoint: {}", e)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            agent,
        })
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.groq, config.groq_api_key())
    }

    #[inline]
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl ChatModel for GroqClient {
    #[inline]
    fn ensure_ready(&self) -> Result<()> {
        self.api_key
            .as_ref()
            .map(|_| ())
            .ok_or_else(|| RagError::Config(MISSING_API_KEY_MESSAGE.to_string()))
    }

    #[inline]
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RagError::Config(MISSING_API_KEY_MESSAGE.to_string()));
        };

        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };
        let body_json = serde_json::to_string(&body)
            .map_err(|e| RagError::Generation(format!("Failed to encode request: {}", e)))?;

        debug!(
            "Posting {} messages to {} with model {}",
            request.messages.len(),
            self.endpoint,
            self.model
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .send(&body_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                warn!("Answer model request failed: {}", e);
                match e {
                    ureq::Error::StatusCode(status) => {
                        RagError::Generation(format!("Answer model returned HTTP {}", status))
                    }
                    other => RagError::Generation(format!("Answer model request failed: {}", other)),
                }
            })?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Malformed answer model response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| RagError::Generation("Answer model response had no message".to_string()))
    }
}
