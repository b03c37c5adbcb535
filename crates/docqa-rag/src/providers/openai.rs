//! OpenAI client for embeddings and chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::types::{Chunk, Vector};

use super::embedding::EmbeddingProvider;
use super::llm::GenerationProvider;
use super::retry::{Failure, RetryPolicy};

const PROVIDER: &str = "openai";

/// Inputs sent per embeddings request
const MAX_BATCH: usize = 256;

/// OpenAI API client with automatic retry
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &OpenAiConfig, retry: RetryPolicy) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the API accepts our key
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed one batch of at most `MAX_BATCH` texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let url = self.url("embeddings");

        tracing::debug!(
            "Embedding batch of {} texts with {}",
            texts.len(),
            self.config.embed_model
        );

        let mut data = self
            .retry
            .run(PROVIDER, || async {
                let request = EmbeddingRequest {
                    model: &self.config.embed_model,
                    input: texts,
                };

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::provider(PROVIDER, format!("Embedding request failed: {}", e))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Failure::from_status(
                        status,
                        api_error("Embedding", response).await,
                    ));
                }

                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    Error::provider(
                        PROVIDER,
                        format!("Failed to parse embedding response: {}", e),
                    )
                })?;

                Ok::<_, Failure>(parsed.data)
            })
            .await?;

        if data.len() != texts.len() {
            return Err(Error::provider(
                PROVIDER,
                format!(
                    "Expected {} embeddings, received {}",
                    texts.len(),
                    data.len()
                ),
            ));
        }

        // The API tags each vector with its input position
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

async fn api_error(operation: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Error::provider(
        PROVIDER,
        format!("{} failed: HTTP {} - {}", operation, status, detail),
    )
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::provider(PROVIDER, "API returned no embedding"))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn health_check(&self) -> Result<bool> {
        OpenAiClient::health_check(self).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    async fn generate(&self, question: &str, context: &[Chunk]) -> Result<String> {
        let url = self.url("chat/completions");
        let prompt = PromptBuilder::build_rag_prompt(question, context);

        tracing::info!("Generating answer with model: {}", self.config.chat_model);

        self.retry
            .run(PROVIDER, || async {
                let request = ChatRequest {
                    model: &self.config.chat_model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: &prompt,
                    }],
                    temperature: self.config.temperature,
                };

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::provider(PROVIDER, format!("Generation request failed: {}", e))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Failure::from_status(
                        status,
                        api_error("Generation", response).await,
                    ));
                }

                let parsed: ChatResponse = response.json().await.map_err(|e| {
                    Error::provider(
                        PROVIDER,
                        format!("Failed to parse generation response: {}", e),
                    )
                })?;

                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| {
                        Failure::Transient(Error::provider(PROVIDER, "Response contained no answer"))
                    })
            })
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        OpenAiClient::health_check(self).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    fn client(base_url: String, max_retries: u32) -> OpenAiClient {
        let config = OpenAiConfig {
            base_url,
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let retry = RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_secs(5));
        OpenAiClient::new(&config, retry).unwrap()
    }

    /// Answers each batch in reverse order, embedding input `"n"` as `[n, 1]`
    async fn reversed_embeddings(
        State(requests): State<Arc<AtomicUsize>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        requests.fetch_add(1, Ordering::SeqCst);
        let inputs = body["input"].as_array().cloned().unwrap_or_default();
        let data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .rev()
            .map(|(i, text)| {
                let n: f32 = text.as_str().and_then(|t| t.parse().ok()).unwrap_or(-1.0);
                json!({"index": i, "embedding": [n, 1.0]})
            })
            .collect();
        Json(json!({"data": data}))
    }

    #[tokio::test]
    async fn test_embed_many_splits_batches_and_keeps_input_order() {
        let requests = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/embeddings", post(reversed_embeddings))
            .with_state(Arc::clone(&requests));
        let client = client(serve(router).await, 0);

        let texts: Vec<String> = (0..300).map(|i| i.to_string()).collect();
        let embeddings = client.embed_many(&texts).await.unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 2);
        assert_eq!(embeddings.len(), 300);
        for (i, embedding) in embeddings.iter().enumerate() {
            assert_eq!(embedding, &vec![i as f32, 1.0]);
        }
    }

    #[tokio::test]
    async fn test_rejected_key_is_not_retried() {
        let requests = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/embeddings",
                post(|State(requests): State<Arc<AtomicUsize>>| async move {
                    requests.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": {"message": "Incorrect API key provided"}})),
                    )
                }),
            )
            .with_state(Arc::clone(&requests));
        let client = client(serve(router).await, 3);

        let err = client.embed("hello").await.unwrap_err();
        match err {
            Error::Provider { message, .. } => {
                assert!(message.contains("401"));
                assert!(message.contains("Incorrect API key provided"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let requests = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/embeddings",
                post(|State(requests): State<Arc<AtomicUsize>>| async move {
                    requests.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }),
            )
            .with_state(Arc::clone(&requests));
        let client = client(serve(router).await, 2);

        assert!(matches!(
            client.embed("hello").await,
            Err(Error::Provider { .. })
        ));
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = OpenAiConfig::default();
        assert!(matches!(
            OpenAiClient::new(&config, RetryPolicy::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_url_joins_base() {
        let config = OpenAiConfig {
            base_url: "http://localhost:9999/v1/".into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let client = OpenAiClient::new(&config, RetryPolicy::default()).unwrap();
        assert_eq!(client.url("embeddings"), "http://localhost:9999/v1/embeddings");
    }

    #[test]
    fn test_embedding_response_order_restored() {
        let mut parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        )
        .unwrap();
        parsed.data.sort_by_key(|d| d.index);
        assert_eq!(parsed.data[0].embedding, vec![1.0, 0.0]);
    }
}
