//! Answer generation helpers

mod prompt;

pub use prompt::{PromptBuilder, CONTEXT_ONLY_INSTRUCTION};
