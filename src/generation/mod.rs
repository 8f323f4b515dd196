
pub mod groq;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::conversation::{Role, Turn, recent_turns};
use crate::Result;

pub use groq::GroqClient;

/// Role constraints sent ahead of every question
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful medical information assistant. Your role is to provide clear, short, and easy-to-understand information based on the context provided.

Rules:
- Answer only from the given context when possible. If the context does not contain enough information, say so and suggest the user consult a healthcare provider.
- Keep answers brief (2-4 short paragraphs max). Use simple language.
- Do not diagnose conditions or recommend specific treatments or dosages.
- Do not replace professional medical advice. When in doubt, advise seeing a doctor or pharmacist.
- End relevant answers with a short reminder that this is general information and not medical advice.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    #[inline]
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        };
        Self::new(role, turn.text.clone())
    }
}

/// Everything the hosted model receives for one answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A text-completion service treated as opaque.
///
/// Implementations report a missing credential as [`crate::RagError::Config`]
/// and every other failure as [`crate::RagError::Generation`], without retrying.
pub trait ChatModel: Send + Sync {
    /// Fail before any work is done when the model cannot be called at all
    #[inline]
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Composes prompts from retrieved context and history and asks the model for an answer
pub struct AnswerGenerator {
    model: Box<dyn ChatModel>,
    max_tokens: u32,
    max_history_turns: usize,
}

impl std::fmt::Debug for AnswerGenerator {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("max_tokens", &self.max_tokens)
            .field("max_history_turns", &self.max_history_turns)
            .finish_non_exhaustive()
    }
}

impl AnswerGenerator {
    #[inline]
    pub fn new(model: Box<dyn ChatModel>, max_tokens: u32, max_history_turns: usize) -> Self {
        Self {
            model,
            max_tokens,
            max_history_turns,
        }
    }

    #[inline]
    pub fn from_config(model: Box<dyn ChatModel>, config: &Config) -> Self {
        Self::new(
            model,
            config.chat.max_response_tokens,
            config.chat.max_history_turns,
        )
    }

    /// Build the request: system instruction with context, recent history, then the question
    #[inline]
    pub fn compose(&self, context: &str, history: &[Turn], question: &str) -> CompletionRequest {
        let history = recent_turns(history, self.max_history_turns);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(
            MessageRole::System,
            format!("{}\n\nContext:\n{}", SYSTEM_INSTRUCTION, context),
        ));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::new(MessageRole::User, question));

        CompletionRequest {
            messages,
            temperature: 0.0,
            max_tokens: self.max_tokens,
        }
    }

    #[inline]
    pub fn ensure_ready(&self) -> Result<()> {
        self.model.ensure_ready()
    }

    #[inline]
    pub fn generate(&self, context: &str, history: &[Turn], question: &str) -> Result<String> {
        let request = self.compose(context, history, question);
        debug!(
            "Requesting answer with {} messages and {} context characters",
            request.messages.len(),
            context.len()
        );
        self.model.complete(&request)
    }
}
