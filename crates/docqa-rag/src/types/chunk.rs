//! Chunk type with provenance tracking

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Embedding vector; dimensionality is fixed by the embedding model
pub type Vector = Vec<f32>;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, split per page
    Pdf,
    /// Plain text file
    Text,
    /// Markdown file (treated as plain text)
    Markdown,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension (without the leading dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if the loader can handle this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short lowercase name, used in chunk metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Unknown => "unknown",
        }
    }
}

/// Immutable unit of retrievable text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Source identifier (file path or inline label)
    pub source: String,
    /// Position within the source (0-based)
    pub sequence_index: u32,
    /// Byte offset where the chunk starts within its text unit
    pub char_start: usize,
    /// Byte offset where the chunk ends within its text unit
    pub char_end: usize,
    /// Additional provenance such as the PDF page
    #[serde(default)]
    pub extra_metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Create a chunk with empty extra metadata
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        sequence_index: u32,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            sequence_index,
            char_start,
            char_end,
            extra_metadata: BTreeMap::new(),
        }
    }

    /// Attach an extra metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_metadata.insert(key.into(), value.into());
        self
    }

    /// Flat metadata object as returned by the query endpoint
    pub fn metadata_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("source".into(), self.source.clone().into());
        map.insert("sequence_index".into(), self.sequence_index.into());
        map.insert("char_start".into(), self.char_start.into());
        map.insert("char_end".into(), self.char_end.into());
        for (key, value) in &self.extra_metadata {
            map.insert(key.clone(), value.clone().into());
        }
        serde_json::Value::Object(map)
    }

    /// Short human-readable provenance, e.g. `report.pdf, Page 3`
    pub fn source_label(&self) -> String {
        match self.extra_metadata.get("page") {
            Some(page) => format!("{}, Page {}", self.source, page),
            None => format!("{}, #{}", self.source, self.sequence_index),
        }
    }
}
