//! Request types for ingestion and queries

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the text of a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReference {
    /// File or directory on the local filesystem
    Path(PathBuf),
    /// Inline text supplied by the caller
    Content {
        /// Document text
        text: String,
        /// Source label; defaults to `inline:<position>`
        label: Option<String>,
    },
    /// Remote URL (reserved, rejected)
    Url(String),
}

impl DocumentReference {
    /// Reference a filesystem path
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Reference inline text
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            text: text.into(),
            label: None,
        }
    }

    /// Short description used in logs and skip reports
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Content { label: Some(label), .. } => label.clone(),
            Self::Content { text, .. } => format!("inline content ({} bytes)", text.len()),
            Self::Url(url) => url.clone(),
        }
    }
}

/// Wire form of a document reference: at most one field is expected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentReferenceBody {
    /// Remote URL (not implemented)
    #[serde(default)]
    pub url: Option<String>,
    /// Local file or directory path
    #[serde(default)]
    pub file_path: Option<String>,
    /// Inline text
    #[serde(default)]
    pub content: Option<String>,
}

impl DocumentReferenceBody {
    /// Convert to a reference. `file_path` wins over `url`, which wins over
    /// `content`. Empty strings count as absent. `None` when nothing is set.
    pub fn into_reference(self) -> Option<DocumentReference> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        if let Some(path) = present(self.file_path) {
            return Some(DocumentReference::Path(PathBuf::from(path)));
        }
        if let Some(url) = present(self.url) {
            return Some(DocumentReference::Url(url));
        }
        present(self.content).map(DocumentReference::content)
    }
}

/// POST /ingest body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Caller-chosen session identifier
    pub session_id: String,
    /// Documents to load
    pub documents: Vec<DocumentReferenceBody>,
}

/// POST /query body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Session to search
    pub session_id: String,
    /// Natural-language question
    pub query: String,
    /// Number of chunks to retrieve (server default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Also generate an answer from the retrieved context
    #[serde(default)]
    pub generate: bool,
}
