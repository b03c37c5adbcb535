//! Embedding provider trait for turning text into vectors

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Vector;

/// Trait for generating text embeddings
///
/// Implementations must be deterministic for a given (text, model) pair.
///
/// Implementations:
/// - `OpenAiClient`: OpenAI embeddings API (text-embedding-3-small)
/// - `OllamaClient`: local Ollama server (nomic-embed-text)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Generate embeddings for multiple texts, one vector per input in input order
    ///
    /// Default implementation calls `embed` sequentially.
    /// Implementations should override for better throughput.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
