//! In-process provider doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docqa_rag::config::RagConfig;
use docqa_rag::providers::{EmbeddingProvider, GenerationProvider};
use docqa_rag::types::{Chunk, Vector};
use docqa_rag::{Error, RagPipeline, Result, SessionStore};

/// Bag-of-words embedder: each lowercase word is hashed into one of `dims` buckets
pub struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vector {
        let mut vector = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dims as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Err(Error::provider("failing", "quota exceeded"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Embedder that never answers in time
pub struct SlowEmbedder(pub Duration);

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        tokio::time::sleep(self.0).await;
        Ok(vec![1.0, 0.0])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Hashing embedder that takes a fixed time per text
pub struct PerTextDelayEmbedder {
    pub delay: Duration,
    pub inner: HashEmbedder,
}

#[async_trait]
impl EmbeddingProvider for PerTextDelayEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "per-text"
    }
}

/// Embedder whose batch call drops the last vector
pub struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vector>> {
        Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "short"
    }
}

/// Generator that echoes the question and the context it was given
pub struct EchoGenerator;

#[async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(&self, question: &str, context: &[Chunk]) -> Result<String> {
        let texts: Vec<&str> = context.iter().map(|c| c.text.as_str()).collect();
        Ok(format!("Q: {} | C: {}", question, texts.join(" / ")))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _question: &str, _context: &[Chunk]) -> Result<String> {
        Err(Error::provider("failing", "model overloaded"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "none"
    }
}

/// Pipeline over a fresh store with the hashing embedder and echo generator
pub fn test_pipeline() -> RagPipeline {
    pipeline_with(
        Arc::new(HashEmbedder::new(256)),
        Arc::new(EchoGenerator),
        Arc::new(SessionStore::new()),
    )
}

/// Pipeline over explicit collaborators with default configuration
pub fn pipeline_with(
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    sessions: Arc<SessionStore>,
) -> RagPipeline {
    RagPipeline::new(&RagConfig::default(), embedder, generator, sessions)
}
