
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::conversation::Turn;
use crate::embeddings::Embedder;
use crate::generation::{AnswerGenerator, ChatModel};
use crate::retrieval::Retriever;
use crate::safety::{QueryValidator, sanitize_for_display};
use crate::{RagError, Result};

/// Appended to every answer
pub const DISCLAIMER_FOOTER: &str = "\n\nThis is for general information only, not medical advice. Please consult a healthcare provider for your situation.";

/// Shown once when a session starts
pub const DISCLAIMER: &str = "This assistant provides general health information only. It is not a substitute for professional medical advice, diagnosis, or treatment. Always seek the advice of your doctor or other qualified health provider with any questions you may have about a medical condition. In an emergency, call your local emergency number.";

pub const FALLBACK_ANSWER: &str = "I couldn't find enough relevant information to answer that. Please rephrase or consult a healthcare provider.";

pub const INDEX_MISSING_MESSAGE: &str =
    "The knowledge base is not ready. Please run: health-rag build";

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while answering. Please try again or rephrase your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    InvalidInput,
    IndexUnavailable,
    Configuration,
    Failure,
}

/// Terminal state of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Answered(String),
    Rejected {
        kind: RejectionKind,
        message: String,
    },
}

impl ChatOutcome {
    /// Split into the `(answer, error)` pair the presentation layer consumes
    #[inline]
    pub fn into_reply(self) -> (String, Option<String>) {
        match self {
            Self::Answered(answer) => (answer, None),
            Self::Rejected { message, .. } => (String::new(), Some(message)),
        }
    }

    #[inline]
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }
}

/// Per-request limits applied around generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantSettings {
    pub max_display_length: usize,
}

impl AssistantSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_display_length: config.chat.max_display_length,
        }
    }
}

/// Long-lived handle tying validation, retrieval and generation together
#[derive(Debug)]
pub struct Assistant {
    retriever: Retriever,
    generator: AnswerGenerator,
    validator: QueryValidator,
    settings: AssistantSettings,
}

impl Assistant {
    #[inline]
    pub fn new(
        retriever: Retriever,
        generator: AnswerGenerator,
        validator: QueryValidator,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            retriever,
            generator,
            validator,
            settings,
        }
    }

    /// Load the index and wire up the models described by `config`
    #[inline]
    pub async fn open(
        config: &Config,
        embedder: Box<dyn Embedder>,
        model: Box<dyn ChatModel>,
    ) -> Result<Self> {
        let retriever =
            Retriever::open(&config.index_dir(), embedder, config.retrieval.top_k).await?;
        let generator = AnswerGenerator::from_config(model, config);
        let validator = QueryValidator::from_config(config)?;

        info!(
            "Assistant ready (index available: {})",
            retriever.is_available()
        );
        Ok(Self::new(
            retriever,
            generator,
            validator,
            AssistantSettings::from_config(config),
        ))
    }

    #[inline]
    pub fn is_index_available(&self) -> bool {
        self.retriever.is_available()
    }

    /// Answer one message given the prior session history
    #[inline]
    pub async fn chat(&self, message: Option<&str>, history: &[Turn]) -> ChatOutcome {
        if let Err(e) = self.validator.validate(message) {
            return reject(e);
        }
        let question = message.map(str::trim).unwrap_or_default();

        match self.answer(question, history).await {
            Ok(answer) => ChatOutcome::Answered(self.postprocess(&answer)),
            Err(e) => reject(e),
        }
    }

    async fn answer(&self, question: &str, history: &[Turn]) -> Result<String> {
        // A missing credential is reported even when retrieval would also fail
        self.generator.ensure_ready()?;
        let context = self.retriever.retrieve_context(question).await?;
        debug!("Retrieved {} characters of context", context.len());
        self.generator.generate(&context, history, question)
    }

    fn postprocess(&self, answer: &str) -> String {
        let answer = if answer.trim().is_empty() {
            FALLBACK_ANSWER
        } else {
            answer
        };

        let mut reply = sanitize_for_display(Some(answer), self.settings.max_display_length);
        reply.push_str(DISCLAIMER_FOOTER);
        reply
    }
}

fn reject(error: RagError) -> ChatOutcome {
    let (kind, message) = match error {
        RagError::InvalidInput(reason) => {
            debug!("Rejected input: {}", reason);
            (RejectionKind::InvalidInput, reason)
        }
        RagError::IndexUnavailable { path } => {
            warn!("Vector index unavailable at {}", path.display());
            (RejectionKind::IndexUnavailable, INDEX_MISSING_MESSAGE.to_string())
        }
        RagError::Config(message) => {
            warn!("Configuration problem: {}", message);
            (RejectionKind::Configuration, message)
        }
        other => {
            error!("Failed to answer question: {:?}", other);
            (RejectionKind::Failure, GENERIC_FAILURE_MESSAGE.to_string())
        }
    };
    ChatOutcome::Rejected { kind, message }
}
