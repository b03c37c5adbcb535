//! Document loader: turns references into provenance-tagged chunks

use std::path::Path;
use walkdir::WalkDir;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentReference, FileType, SkippedSource};

use super::chunker::TextChunker;
use super::parser::{FileParser, ParsedDocument};

/// Chunks produced from one reference plus whatever was skipped on the way
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Chunks in source order
    pub chunks: Vec<Chunk>,
    /// Files dropped by the directory skip policy
    pub skipped: Vec<SkippedSource>,
    /// Number of files or inline texts that produced chunks
    pub sources: usize,
}

/// Loads files, directories and inline text into chunks
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    chunker: TextChunker,
}

impl DocumentLoader {
    /// Create a loader with the given chunking settings
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunker: TextChunker::from_config(config),
        }
    }

    /// Load a reference into chunks
    pub fn load(&self, reference: &DocumentReference) -> Result<Vec<Chunk>> {
        Ok(self.load_with_report(reference)?.chunks)
    }

    /// Load a reference, also reporting files skipped inside directories
    pub fn load_with_report(&self, reference: &DocumentReference) -> Result<LoadReport> {
        match reference {
            DocumentReference::Path(path) => self.load_path(path),
            DocumentReference::Content { text, label } => {
                let label = label.as_deref().unwrap_or("inline");
                let chunks = self.load_text(label, text)?;
                Ok(LoadReport {
                    sources: usize::from(!chunks.is_empty()),
                    chunks,
                    skipped: Vec::new(),
                })
            }
            DocumentReference::Url(url) => Err(Error::UrlNotSupported(url.clone())),
        }
    }

    /// Load a file or recursively load a directory
    pub fn load_path(&self, path: &Path) -> Result<LoadReport> {
        if path.is_file() {
            let chunks = self.load_file(path)?;
            Ok(LoadReport {
                sources: usize::from(!chunks.is_empty()),
                chunks,
                skipped: Vec::new(),
            })
        } else if path.is_dir() {
            Ok(self.load_directory(path))
        } else {
            Err(Error::SourceNotFound(path.display().to_string()))
        }
    }

    /// Load inline text
    pub fn load_text(&self, source: &str, text: &str) -> Result<Vec<Chunk>> {
        let chunks: Vec<Chunk> = self
            .chunker
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(i, span)| Chunk::new(span.text, source, i as u32, span.start, span.end))
            .collect();

        if chunks.is_empty() && !text.is_empty() {
            return Err(Error::EmptyInput(source.to_string()));
        }

        Ok(chunks)
    }

    /// Load a single file
    pub fn load_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let source = path.display().to_string();
        let file_type = FileType::from_path(path);

        if !file_type.is_supported() {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(no extension)".to_string());
            return Err(Error::UnsupportedFormat(format!("{} ({})", ext, source)));
        }

        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Error::SourceNotFound(source.clone())
            }
            _ => Error::Io(e),
        })?;

        let parsed = FileParser::parse(&source, file_type, &data)?;
        let chunks = self.chunk_parsed(&source, &parsed);

        if chunks.is_empty() && parsed.text_len() > 0 {
            return Err(Error::EmptyInput(source));
        }

        match file_type {
            FileType::Pdf => tracing::info!(
                "Processed PDF file: {} ({} pages, {} chunks)",
                source,
                parsed.pages.len(),
                chunks.len()
            ),
            _ => tracing::info!("Processed text file: {} ({} chunks)", source, chunks.len()),
        }

        Ok(chunks)
    }

    fn load_directory(&self, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    report.skipped.push(SkippedSource {
                        source: e
                            .path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| dir.display().to_string()),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.load_file(entry.path()) {
                Ok(chunks) => {
                    if !chunks.is_empty() {
                        report.sources += 1;
                    }
                    report.chunks.extend(chunks);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                    report.skipped.push(SkippedSource {
                        source: entry.path().display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn chunk_parsed(&self, source: &str, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &parsed.pages {
            for span in self.chunker.split(&page.content) {
                let mut chunk = Chunk::new(
                    span.text,
                    source,
                    chunks.len() as u32,
                    span.start,
                    span.end,
                )
                .with_metadata("file_type", parsed.file_type.as_str());

                if let Some(page_number) = page.page_number {
                    chunk = chunk.with_metadata("page", page_number.to_string());
                }
                chunks.push(chunk);
            }
        }

        chunks
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}
