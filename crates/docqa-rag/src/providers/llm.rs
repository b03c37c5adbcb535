//! Generation provider trait for answering from retrieved context

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// Trait for LLM-based answer generation
///
/// Implementations build the prompt with `PromptBuilder`, which restricts the
/// model to the supplied context.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Answer `question` using only `context`
    async fn generate(&self, question: &str, context: &[Chunk]) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model used for generation
    fn model(&self) -> &str;
}
