
use fancy_regex::Regex;
use tracing::warn;

use crate::config::Config;
use crate::{RagError, Result};

/// Requests for explicit dosing amounts are deferred to a clinician
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[r"(?i)\b(prescribe|dosage|mg|mcg|units)\s*\d+"];

pub const MISSING_QUERY_REASON: &str = "No query provided.";
pub const EMPTY_QUERY_REASON: &str = "Please enter a question.";
pub const BLOCKED_QUERY_REASON: &str =
    "I can't provide specific dosing. Please ask your doctor or pharmacist for dosage information.";

const ELLIPSIS: &str = "...";

/// Rejects queries before any retrieval or generation work happens
#[derive(Debug, Clone)]
pub struct QueryValidator {
    max_length: usize,
    patterns: Vec<(String, Regex)>,
}

impl QueryValidator {
    #[inline]
    pub fn new(max_length: usize, blocked_patterns: &[String]) -> Result<Self> {
        let patterns = blocked_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map(|regex| (pattern.clone(), regex))
                    .map_err(|e| {
                        RagError::Config(format!("Invalid blocked pattern '{}': {}", pattern, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            max_length,
            patterns,
        })
    }

    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.chat.max_query_length, &config.safety.blocked_patterns)
    }

    #[inline]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Check a query, returning the user-facing reason on rejection
    #[inline]
    pub fn validate(&self, query: Option<&str>) -> Result<()> {
        let Some(query) = query else {
            return Err(RagError::InvalidInput(MISSING_QUERY_REASON.to_string()));
        };

        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(RagError::InvalidInput(EMPTY_QUERY_REASON.to_string()));
        }

        if trimmed.chars().count() > self.max_length {
            return Err(RagError::InvalidInput(format!(
                "Query is too long. Please keep it under {} characters.",
                self.max_length
            )));
        }

        for (source, regex) in &self.patterns {
            match regex.is_match(trimmed) {
                Ok(true) => {
                    warn!("Query rejected by blocked pattern: {}", source);
                    return Err(RagError::InvalidInput(BLOCKED_QUERY_REASON.to_string()));
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Blocked pattern '{}' failed to evaluate: {}", source, e);
                }
            }
        }

        Ok(())
    }
}

/// Trim text and cap it at `max_len` characters, marking truncation with an ellipsis
#[inline]
pub fn sanitize_for_display(text: Option<&str>, max_len: usize) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = trimmed.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
