//! Pipeline orchestrator: ingest and query over per-session indexes
//!
//! A session moves from absent to indexed on its first successful ingest and
//! stays indexed; later ingests append. Queries against an absent session
//! fail with `SessionNotFound`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RagConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::ingestion::DocumentLoader;
use crate::providers::{EmbeddingProvider, GenerationProvider, Providers, RetryPolicy};
use crate::retrieval::VectorIndex;
use crate::session::SessionStore;
use crate::types::{
    AnswerResult, Chunk, DocumentReference, IngestOutcome, RetrievalResult, SkippedSource,
};

/// Chunks loaded from one batch of references, not yet embedded
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    /// Chunks in reference order
    pub chunks: Vec<Chunk>,
    /// Sources that produced chunks
    pub sources: usize,
    /// Sources dropped by the skip policy
    pub skipped: Vec<SkippedSource>,
}

/// Ingest and query orchestrator
#[derive(Clone)]
pub struct RagPipeline {
    loader: DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    sessions: Arc<SessionStore>,
    retrieval: RetrievalConfig,
    /// Upper bound on one provider request, retries included
    call_timeout: Duration,
}

impl RagPipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            loader: DocumentLoader::new(&config.chunking),
            embedder,
            generator,
            sessions,
            retrieval: config.retrieval.clone(),
            call_timeout: RetryPolicy::from_config(&config.provider).total_budget(),
        }
    }

    /// Create a pipeline with the configured providers and an empty session store
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let providers = Providers::from_config(&config.provider)?;
        Ok(Self::new(
            config,
            providers.embedder,
            providers.generator,
            Arc::new(SessionStore::new()),
        ))
    }

    /// Override the bound on a single provider request
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Session store shared with this pipeline
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Default number of chunks retrieved per query
    pub fn default_top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Generation provider
    pub fn generator(&self) -> &Arc<dyn GenerationProvider> {
        &self.generator
    }

    /// Probe both providers; `false` means at least one is unreachable
    pub async fn providers_healthy(&self) -> bool {
        let embed_ok = self.embedder.health_check().await.unwrap_or(false);
        let generate_ok = self.generator.health_check().await.unwrap_or(false);
        embed_ok && generate_ok
    }

    /// Load, embed and index `references` into the session.
    ///
    /// Either every produced chunk is indexed or none is; a failed call never
    /// creates the session.
    pub async fn ingest(
        &self,
        session_id: &str,
        references: &[DocumentReference],
    ) -> Result<IngestOutcome> {
        let loaded = self.load(references).await?;
        self.index(session_id, loaded).await
    }

    /// Load references into chunks without embedding them.
    ///
    /// Unlabelled inline content is labelled `inline:<position>`. Per-reference
    /// failures are logged and skipped; a URL reference rejects the whole batch.
    pub async fn load(&self, references: &[DocumentReference]) -> Result<LoadedDocuments> {
        if let Some(DocumentReference::Url(url)) = references
            .iter()
            .find(|r| matches!(r, DocumentReference::Url(_)))
        {
            return Err(Error::UrlNotSupported(url.clone()));
        }

        let loader = self.loader.clone();
        let references: Vec<DocumentReference> = references
            .iter()
            .enumerate()
            .map(|(i, reference)| match reference {
                DocumentReference::Content { text, label: None } => DocumentReference::Content {
                    text: text.clone(),
                    label: Some(format!("inline:{}", i)),
                },
                other => other.clone(),
            })
            .collect();

        let loaded = tokio::task::spawn_blocking(move || {
            let mut loaded = LoadedDocuments::default();

            for reference in &references {
                match loader.load_with_report(reference) {
                    Ok(report) => {
                        loaded.chunks.extend(report.chunks);
                        loaded.sources += report.sources;
                        loaded.skipped.extend(report.skipped);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", reference.describe(), e);
                        loaded.skipped.push(SkippedSource {
                            source: reference.describe(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            loaded
        })
        .await
        .map_err(|e| Error::internal(format!("Document loading task failed: {}", e)))?;

        if loaded.chunks.is_empty() {
            let detail = if loaded.skipped.is_empty() {
                String::new()
            } else {
                let reasons: Vec<String> = loaded
                    .skipped
                    .iter()
                    .map(|s| format!("{}: {}", s.source, s.reason))
                    .collect();
                format!(" ({})", reasons.join("; "))
            };
            return Err(Error::NoValidDocuments(detail));
        }

        Ok(loaded)
    }

    /// Embed loaded chunks in one batch and append them to the session's index
    pub async fn index(&self, session_id: &str, loaded: LoadedDocuments) -> Result<IngestOutcome> {
        if loaded.chunks.is_empty() {
            return Err(Error::NoValidDocuments(String::new()));
        }

        let texts: Vec<String> = loaded.chunks.iter().map(|c| c.text.clone()).collect();
        tracing::debug!(
            "Embedding {} chunks with {}",
            texts.len(),
            self.embedder.name()
        );

        // A provider makes at most one request per text
        let limit = self
            .call_timeout
            .saturating_mul(u32::try_from(texts.len()).unwrap_or(u32::MAX));
        let vectors = self
            .bounded(self.embedder.name(), limit, self.embedder.embed_many(&texts))
            .await?;

        if vectors.len() != loaded.chunks.len() {
            return Err(Error::provider(
                self.embedder.name(),
                format!(
                    "returned {} embeddings for {} chunks",
                    vectors.len(),
                    loaded.chunks.len()
                ),
            ));
        }

        let batch = VectorIndex::from_entries(vectors.into_iter().zip(loaded.chunks))?;
        let chunks_indexed = self.sessions.append(session_id, batch)?;

        tracing::info!(
            "Indexed {} chunks from {} sources into session '{}'",
            chunks_indexed,
            loaded.sources,
            session_id
        );

        Ok(IngestOutcome {
            chunks_indexed,
            sources: loaded.sources,
            skipped: loaded.skipped,
        })
    }

    /// Top-k chunks for `question`; `k` defaults to the configured `top_k`
    pub async fn retrieve(
        &self,
        session_id: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<RetrievalResult> {
        if question.trim().is_empty() {
            return Err(Error::invalid("query must not be empty"));
        }
        let k = k.unwrap_or(self.retrieval.top_k);
        if k == 0 {
            return Err(Error::invalid("k must be at least 1"));
        }

        let session = self.sessions.get(session_id)?;
        let query_vector = self
            .bounded(
                self.embedder.name(),
                self.call_timeout,
                self.embedder.embed(question),
            )
            .await?;

        let results = session.search(&query_vector, k)?;
        tracing::debug!(
            "Retrieved {} chunks for session '{}'",
            results.len(),
            session_id
        );
        Ok(results)
    }

    /// Retrieve context for `question` and generate an answer from it
    pub async fn query(
        &self,
        session_id: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<AnswerResult> {
        let used_context = self.retrieve(session_id, question, k).await?;
        self.answer(question, used_context).await
    }

    /// Generate an answer from already retrieved context
    pub async fn answer(
        &self,
        question: &str,
        used_context: RetrievalResult,
    ) -> Result<AnswerResult> {
        let chunks: Vec<Chunk> = used_context.iter().map(|r| r.chunk.clone()).collect();

        let answer = self
            .bounded(
                self.generator.name(),
                self.call_timeout,
                self.generator.generate(question, &chunks),
            )
            .await?;

        Ok(AnswerResult {
            answer,
            used_context,
        })
    }

    async fn bounded<T>(
        &self,
        provider: &str,
        limit: Duration,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| Error::provider(provider, format!("call timed out after {:?}", limit)))?
    }
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("embedder", &self.embedder.name())
            .field("generator", &self.generator.name())
            .field("sessions", &self.sessions.len())
            .field("top_k", &self.retrieval.top_k)
            .finish()
    }
}
