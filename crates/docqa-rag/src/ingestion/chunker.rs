//! Text chunking with offset tracking

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Rough size of one token in bytes of English text
pub const CHARS_PER_TOKEN: usize = 4;

/// A chunk of text with its byte offsets in the chunked input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Trimmed chunk text
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Sentence-aware text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in bytes
    chunk_size: usize,
    /// Maximum overlap between consecutive chunks in bytes
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; sizes are in bytes
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(CHARS_PER_TOKEN);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create a chunker from token-based settings
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(
            config.max_chunk_tokens.saturating_mul(CHARS_PER_TOKEN),
            config.overlap_tokens.saturating_mul(CHARS_PER_TOKEN),
        )
    }

    /// Maximum chunk size in bytes
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split text into non-empty chunks of at most `chunk_size` bytes
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut window: VecDeque<(usize, usize)> = VecDeque::new();

        for piece in self.pieces(text) {
            let piece_len = piece.1 - piece.0;

            if let (Some(&(start, _)), Some(&(_, end))) = (window.front(), window.back()) {
                if end - start + piece_len > self.chunk_size {
                    push_span(text, start, end, &mut spans);

                    // Keep whole trailing pieces as overlap, as long as the
                    // next chunk still fits.
                    while let Some(&(front, _)) = window.front() {
                        let kept = end - front;
                        if kept > self.overlap || kept + piece_len > self.chunk_size {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }

            window.push_back(piece);
        }

        if let (Some(&(start, _)), Some(&(_, end))) = (window.front(), window.back()) {
            push_span(text, start, end, &mut spans);
        }

        spans
    }

    /// Contiguous pieces covering `text`, each at most `chunk_size` bytes.
    /// Sentences where possible, words for long sentences, chars for long words.
    fn pieces(&self, text: &str) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();

        for (offset, sentence) in text.split_sentence_bound_indices() {
            if sentence.len() <= self.chunk_size {
                pieces.push((offset, offset + sentence.len()));
                continue;
            }

            for (word_offset, word) in sentence.split_word_bound_indices() {
                let base = offset + word_offset;
                if word.len() <= self.chunk_size {
                    pieces.push((base, base + word.len()));
                } else {
                    self.split_chars(word, base, &mut pieces);
                }
            }
        }

        pieces
    }

    fn split_chars(&self, word: &str, base: usize, pieces: &mut Vec<(usize, usize)>) {
        let mut start = 0;
        for (idx, ch) in word.char_indices() {
            if idx + ch.len_utf8() - start > self.chunk_size {
                pieces.push((base + start, base + idx));
                start = idx;
            }
        }
        if start < word.len() {
            pieces.push((base + start, base + word.len()));
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

fn push_span(text: &str, start: usize, end: usize, spans: &mut Vec<TextSpan>) {
    let raw = &text[start..end];
    let body = raw.trim();
    if body.is_empty() {
        return;
    }

    let leading = raw.len() - raw.trim_start().len();
    let start = start + leading;
    spans.push(TextSpan {
        text: body.to_string(),
        start,
        end: start + body.len(),
    });
}

/// Approximate token count (~4 bytes per token)
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}
