//! Prompt templates for context-restricted answering

use crate::types::Chunk;

/// Instruction every answer prompt starts with
pub const CONTEXT_ONLY_INSTRUCTION: &str = "Answer the question based on ONLY the provided context.";

const CONTEXT_START: &str = "<context>";
const CONTEXT_END: &str = "</context>";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render retrieved chunks as a numbered context block
    pub fn build_context(chunks: &[Chunk]) -> String {
        let mut context = String::new();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                context.push_str("\n---\n\n");
            }
            context.push_str(&format!("[{}] {}\n{}\n", i + 1, chunk.source_label(), chunk.text));
        }

        context
    }

    /// Build the full answer prompt
    ///
    /// The context sits between explicit delimiters so it cannot be confused
    /// with the question that follows it.
    pub fn build_rag_prompt(question: &str, chunks: &[Chunk]) -> String {
        format!(
            "{instruction}\n\n{start}\n{context}{end}\n\nQuestion: {question}\nAnswer:",
            instruction = CONTEXT_ONLY_INSTRUCTION,
            start = CONTEXT_START,
            context = Self::build_context(chunks),
            end = CONTEXT_END,
            question = question.trim(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_separates_context_and_question() {
        let chunks = vec![
            Chunk::new("The sky is blue.", "inline:0", 0, 0, 16),
            Chunk::new("Grass is green.", "notes.pdf", 1, 0, 15).with_metadata("page", "2"),
        ];
        let prompt = PromptBuilder::build_rag_prompt("What color is the sky?", &chunks);

        assert!(prompt.starts_with(CONTEXT_ONLY_INSTRUCTION));
        let start = prompt.find(CONTEXT_START).unwrap();
        let end = prompt.find(CONTEXT_END).unwrap();
        let question = prompt.find("Question: What color is the sky?").unwrap();
        assert!(start < end && end < question);

        let block = &prompt[start..end];
        assert!(block.contains("[1] inline:0, #0\nThe sky is blue."));
        assert!(block.contains("[2] notes.pdf, Page 2\nGrass is green."));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_empty_context() {
        let prompt = PromptBuilder::build_rag_prompt("Anything?", &[]);
        assert!(prompt.contains("<context>\n</context>"));
    }
}
