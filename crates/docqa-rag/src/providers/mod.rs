//! Provider abstractions for embeddings and answer generation
//!
//! Both capabilities are trait objects so the pipeline can run against the
//! OpenAI API, a local Ollama server, or an in-process test double.

mod embedding;
mod llm;
mod ollama;
mod openai;
mod retry;

use std::sync::Arc;

pub use embedding::EmbeddingProvider;
pub use llm::GenerationProvider;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use retry::{Failure, RetryPolicy};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::Result;

/// Embedding and generation providers built from one configuration
#[derive(Clone)]
pub struct Providers {
    /// Embedding provider
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Generation provider
    pub generator: Arc<dyn GenerationProvider>,
}

impl Providers {
    /// Build both providers from the configured backend; one client serves both roles
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(config);

        match config.kind {
            ProviderKind::OpenAi => {
                let client = Arc::new(OpenAiClient::new(&config.openai, retry)?);
                tracing::info!(
                    "Using OpenAI provider (embed: {}, chat: {})",
                    config.openai.embed_model,
                    config.openai.chat_model
                );
                Ok(Self {
                    embedder: Arc::clone(&client) as Arc<dyn EmbeddingProvider>,
                    generator: client,
                })
            }
            ProviderKind::Ollama => {
                let client = Arc::new(OllamaClient::new(
                    &config.ollama,
                    retry,
                    config.embed_concurrency,
                )?);
                tracing::info!(
                    "Using Ollama provider at {} (embed: {}, generate: {})",
                    config.ollama.base_url,
                    config.ollama.embed_model,
                    config.ollama.generate_model
                );
                Ok(Self {
                    embedder: Arc::clone(&client) as Arc<dyn EmbeddingProvider>,
                    generator: client,
                })
            }
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("embedder", &self.embedder.name())
            .field("generator", &self.generator.name())
            .field("model", &self.generator.model())
            .finish()
    }
}
