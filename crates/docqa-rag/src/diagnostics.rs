//! Token-count estimates for embedding and prompt cost
//!
//! Counts are approximations (4 bytes per token); they do not affect retrieval.

use std::fmt;

use crate::generation::PromptBuilder;
use crate::types::Chunk;

pub use crate::ingestion::estimate_tokens;

/// Estimated tokens to embed, per source in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenReport {
    /// (source, tokens) pairs
    pub by_source: Vec<(String, usize)>,
    /// Sum over every source
    pub total: usize,
}

impl TokenReport {
    /// Tally the chunks of one ingest
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut report = Self::default();

        for chunk in chunks {
            let tokens = estimate_tokens(&chunk.text);
            match report.by_source.iter_mut().find(|(s, _)| *s == chunk.source) {
                Some((_, count)) => *count += tokens,
                None => report.by_source.push((chunk.source.clone(), tokens)),
            }
            report.total += tokens;
        }

        report
    }
}

impl fmt::Display for TokenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---")?;
        for (source, tokens) in &self.by_source {
            writeln!(f, "Source file {} has {} tokens", source, tokens)?;
        }
        writeln!(f, "Total tokens to embed: {}", self.total)?;
        write!(f, "---")
    }
}

/// Estimated size of one answer prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptTokens {
    /// Question tokens
    pub query: usize,
    /// Retrieved context tokens
    pub context: usize,
    /// Tokens in the fully rendered prompt
    pub total: usize,
}

impl PromptTokens {
    /// Estimate the prompt that would be sent for `question` and `context`
    pub fn estimate(question: &str, context: &[Chunk]) -> Self {
        Self {
            query: estimate_tokens(question),
            context: estimate_tokens(&PromptBuilder::build_context(context)),
            total: estimate_tokens(&PromptBuilder::build_rag_prompt(question, context)),
        }
    }
}

impl fmt::Display for PromptTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query tokens: {}, context tokens: {}, prompt tokens: {}",
            self.query, self.context, self.total
        )
    }
}
