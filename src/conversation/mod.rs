
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a chat session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    #[inline]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[inline]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Append-only session history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user(text));
    }

    #[inline]
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::assistant(text));
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `n` turns, oldest first
    #[inline]
    pub fn recent(&self, n: usize) -> &[Turn] {
        recent_turns(&self.turns, n)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Write the session as pretty JSON, creating parent directories as needed
    #[inline]
    pub fn save_transcript(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Other(anyhow::anyhow!("Failed to encode transcript: {}", e)))?;
        fs::write(path, raw)?;
        debug!("Saved {} turns to {}", self.turns.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn load_transcript(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            RagError::Other(anyhow::anyhow!(
                "Failed to read transcript {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Bounded suffix of a history slice
#[inline]
pub fn recent_turns(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}
