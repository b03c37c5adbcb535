//! File parser for the supported document formats

use crate::error::{Error, Result};
use crate::types::FileType;

/// Parsed document split into logical text units
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Text units (one per PDF page, one for plain text)
    pub pages: Vec<PageContent>,
}

impl ParsedDocument {
    /// Total extracted text length in bytes
    pub fn text_len(&self) -> usize {
        self.pages.iter().map(|p| p.content.len()).sum()
    }
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed), `None` for unpaginated text
    pub page_number: Option<u32>,
    /// Text content of the page
    pub content: String,
}

/// File parser dispatching on extension
pub struct FileParser;

impl FileParser {
    /// Parse file bytes according to the file's type
    pub fn parse(source: &str, file_type: FileType, data: &[u8]) -> Result<ParsedDocument> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(source, data),
            FileType::Text | FileType::Markdown => Ok(Self::parse_text(data, file_type)),
            FileType::Unknown => Err(Error::UnsupportedFormat(source.to_string())),
        }
    }

    /// Parse PDF document, one unit per page
    fn parse_pdf(source: &str, data: &[u8]) -> Result<ParsedDocument> {
        match Self::extract_pdf_pages(data) {
            Ok(pages) if pages.iter().any(|p| !p.content.trim().is_empty()) => {
                return Ok(ParsedDocument {
                    file_type: FileType::Pdf,
                    pages,
                });
            }
            Ok(_) => tracing::debug!("No per-page text in {}, trying whole-document extraction", source),
            Err(e) => tracing::debug!("Per-page extraction failed for {}: {}", source, e),
        }

        // Whole document as one page
        let content = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::parse(source, e.to_string()))?;

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            pages: vec![PageContent {
                page_number: Some(1),
                content,
            }],
        })
    }

    fn extract_pdf_pages(data: &[u8]) -> std::result::Result<Vec<PageContent>, lopdf::Error> {
        let doc = lopdf::Document::load_mem(data)?;
        let mut pages = Vec::new();

        for page_number in doc.get_pages().into_keys() {
            let content = doc.extract_text(&[page_number])?;
            pages.push(PageContent {
                page_number: Some(page_number),
                content,
            });
        }

        Ok(pages)
    }

    /// Parse plain text or markdown
    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        let content = String::from_utf8_lossy(data).to_string();

        ParsedDocument {
            file_type,
            pages: vec![PageContent {
                page_number: None,
                content,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text() {
        let parsed = FileParser::parse("a.txt", FileType::Text, b"hello world").unwrap();
        assert_eq!(parsed.pages.len(), 1);
        assert_eq!(parsed.pages[0].content, "hello world");
        assert_eq!(parsed.pages[0].page_number, None);
        assert_eq!(parsed.text_len(), 11);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = FileParser::parse("a.docx", FileType::Unknown, b"").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let err = FileParser::parse("broken.pdf", FileType::Pdf, b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
