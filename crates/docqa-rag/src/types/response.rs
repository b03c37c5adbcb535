//! Result and response types

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// Retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0..=1.0, higher is better)
    pub similarity: f32,
}

/// Top-k hits ordered by descending similarity
pub type RetrievalResult = Vec<SearchResult>;

/// Answer produced from retrieved context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Generated answer
    pub answer: String,
    /// Context handed to the model, in retrieval order
    pub used_context: Vec<SearchResult>,
}

impl AnswerResult {
    /// Chunks that were used as context
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.used_context.iter().map(|r| &r.chunk)
    }
}

/// Source dropped by the loader skip policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSource {
    /// The reference or file that was skipped
    pub source: String,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of a successful ingest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Chunks embedded and inserted by this call
    pub chunks_indexed: usize,
    /// Distinct sources that produced chunks
    pub sources: usize,
    /// Sources dropped along the way
    pub skipped: Vec<SkippedSource>,
}

/// POST /ingest response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Human-readable summary
    pub message: String,
    /// Session the documents were added to
    pub session_id: String,
    /// Chunks embedded and inserted
    pub chunks_indexed: usize,
    /// Sources dropped by the skip policy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedSource>,
}

impl IngestResponse {
    /// Build a response from an ingest outcome
    pub fn from_outcome(session_id: String, outcome: IngestOutcome) -> Self {
        Self {
            message: format!(
                "Successfully processed {} documents into {} chunks",
                outcome.sources, outcome.chunks_indexed
            ),
            session_id,
            chunks_indexed: outcome.chunks_indexed,
            skipped: outcome.skipped,
        }
    }
}

/// POST /query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Retrieved chunk texts, most similar first
    pub context: Vec<String>,
    /// Metadata of each retrieved chunk, parallel to `context`
    pub metadata: Vec<serde_json::Value>,
    /// Generated answer (only when requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl QueryResponse {
    /// Build a retrieval-only response
    pub fn from_results(results: &[SearchResult]) -> Self {
        let mut metadata = Vec::with_capacity(results.len());
        for result in results {
            let mut meta = result.chunk.metadata_json();
            if let Some(map) = meta.as_object_mut() {
                map.insert("similarity".into(), serde_json::json!(result.similarity));
            }
            metadata.push(meta);
        }

        Self {
            context: results.iter().map(|r| r.chunk.text.clone()).collect(),
            metadata,
            answer: None,
        }
    }

    /// Build a response carrying a generated answer
    pub fn from_answer(answer: AnswerResult) -> Self {
        let mut response = Self::from_results(&answer.used_context);
        response.answer = Some(answer.answer);
        response
    }
}
