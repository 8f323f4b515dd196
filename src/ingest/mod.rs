
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::Result;

pub const DEFAULT_CATEGORY: &str = "general";

/// A unit of source content before chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_path: PathBuf,
    /// Present for FAQ entries; plain text files carry no category
    pub category: Option<String>,
}

/// Missing and `null` fields are both treated as absent
#[derive(Debug, Deserialize)]
struct FaqEntry {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FaqFile {
    Many(Vec<FaqEntry>),
    One(FaqEntry),
}

impl FaqEntry {
    fn into_document(self, path: &Path) -> Document {
        let category = self
            .category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Document {
            text: format!(
                "Q: {}\nA: {}\nCategory: {}",
                self.question.unwrap_or_default(),
                self.answer.unwrap_or_default(),
                category
            ),
            metadata: DocumentMetadata {
                source_path: path.to_path_buf(),
                category: Some(category),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Faq,
    Text,
}

impl SourceKind {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Faq),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Load a JSON file holding one FAQ entry or a list of them
#[inline]
pub fn load_faq_json(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)?;
    let parsed: FaqFile = serde_json::from_str(&raw).map_err(|e| {
        anyhow::anyhow!("Failed to parse FAQ file {}: {}", path.display(), e)
    })?;

    let entries = match parsed {
        FaqFile::Many(entries) => entries,
        FaqFile::One(entry) => vec![entry],
    };

    let documents = entries
        .into_iter()
        .map(|entry| entry.into_document(path))
        .collect::<Vec<_>>();

    debug!(
        "Loaded {} FAQ entries from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}

/// Load a plain text or markdown file as a single document
#[inline]
pub fn load_text_file(path: &Path) -> Result<Vec<Document>> {
    let text = fs::read_to_string(path)?;
    Ok(vec![Document {
        text,
        metadata: DocumentMetadata {
            source_path: path.to_path_buf(),
            category: None,
        },
    }])
}

/// Load every supported file directly inside `dir`.
///
/// Files are visited in name order. A file that fails to load is logged and
/// skipped. A missing directory yields no documents.
#[inline]
pub fn load_all(dir: &Path) -> Vec<Document> {
    if !dir.is_dir() {
        warn!("Content directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut paths = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    error!("Failed to read entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect::<Vec<_>>(),
        Err(e) => {
            error!("Failed to read content directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let loaded = match SourceKind::from_path(&path) {
            Some(SourceKind::Faq) => load_faq_json(&path),
            Some(SourceKind::Text) => load_text_file(&path),
            None => {
                debug!("Skipping unsupported file {}", path.display());
                continue;
            }
        };

        match loaded {
            Ok(docs) => documents.extend(docs),
            Err(e) => error!("Failed to load {}: {}", path.display(), e),
        }
    }

    info!(
        "Loaded {} document(s) from {}",
        documents.len(),
        dir.display()
    );
    documents
}
