//! Ollama client for local embeddings and generation

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::types::{Chunk, Vector};

use super::embedding::EmbeddingProvider;
use super::llm::GenerationProvider;
use super::retry::{Failure, RetryPolicy};

const PROVIDER: &str = "ollama";

/// Ollama API client with automatic retry
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
    retry: RetryPolicy,
    /// Embedding requests kept in flight by `embed_many`
    concurrency: usize,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &OllamaConfig, retry: RetryPolicy, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            retry,
            concurrency: concurrency.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed_text(&self, text: &str) -> Result<Vector> {
        let url = self.url("api/embeddings");

        self.retry
            .run(PROVIDER, || async {
                let request = EmbedRequest {
                    model: &self.config.embed_model,
                    prompt: text,
                };

                let response = self
                    .client
                    .post(&url)
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
                        Error::provider(PROVIDER, format!("Embedding failed: HTTP {}", status)),
                    ));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::provider(
                        PROVIDER,
                        format!("Failed to parse embedding response: {}", e),
                    )
                })?;

                Ok::<_, Failure>(embed_response.embedding)
            })
            .await
    }

    /// Generate an answer with retry
    pub async fn generate_answer(&self, question: &str, context: &[Chunk]) -> Result<String> {
        let url = self.url("api/generate");
        let prompt = PromptBuilder::build_rag_prompt(question, context);

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        self.retry
            .run(PROVIDER, || async {
                let request = GenerateRequest {
                    model: &self.config.generate_model,
                    prompt: &prompt,
                    stream: false,
                    options: GenerateOptions {
                        temperature: self.config.temperature,
                    },
                };

                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| {
                        Error::provider(PROVIDER, format!("Generation request failed: {}", e))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Failure::from_status(
                        status,
                        Error::provider(
                            PROVIDER,
                            format!("Generation failed: HTTP {} - {}", status, body),
                        ),
                    ));
                }

                let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                    Error::provider(
                        PROVIDER,
                        format!("Failed to parse generation response: {}", e),
                    )
                })?;

                Ok::<_, Failure>(generate_response.response)
            })
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_text(text).await
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vector>> {
        // No batch endpoint: fan out, `buffered` yields results in input order.
        // Collect the futures first: a borrowing `map` closure is not general
        // enough for the `Send` bound async_trait puts on this future.
        let calls: Vec<_> = texts.iter().map(|text| self.embed_text(text)).collect();
        stream::iter(calls)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        OllamaClient::health_check(self).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl GenerationProvider for OllamaClient {
    async fn generate(&self, question: &str, context: &[Chunk]) -> Result<String> {
        self.generate_answer(question, context).await
    }

    async fn health_check(&self) -> Result<bool> {
        OllamaClient::health_check(self).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.config.generate_model
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

    #[derive(Clone, Default)]
    struct Stub {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        requests: Arc<AtomicUsize>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    fn client(base_url: String, max_retries: u32, concurrency: usize) -> OllamaClient {
        let config = OllamaConfig {
            base_url,
            ..Default::default()
        };
        let retry = RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_secs(5));
        OllamaClient::new(&config, retry, concurrency).unwrap()
    }

    /// Embeds prompt `"n"` as `[n]`; lower numbers answer later
    async fn delayed_embedding(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
        let now = stub.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stub.peak.fetch_max(now, Ordering::SeqCst);

        let n: u64 = body["prompt"].as_str().and_then(|p| p.parse().ok()).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((10 - n % 10) * 5)).await;

        stub.in_flight.fetch_sub(1, Ordering::SeqCst);
        Json(json!({"embedding": [n as f32]}))
    }

    #[tokio::test]
    async fn test_embed_many_keeps_input_order_with_bounded_fan_out() {
        let stub = Stub::default();
        let router = Router::new()
            .route("/api/embeddings", post(delayed_embedding))
            .with_state(stub.clone());
        let client = client(serve(router).await, 0, 4);

        let texts: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let embeddings = client.embed_many(&texts).await.unwrap();

        let expected: Vec<Vector> = (0..12).map(|i| vec![i as f32]).collect();
        assert_eq!(embeddings, expected);

        let peak = stub.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {}", peak);
        assert!(peak >= 2, "requests were not fanned out");
    }

    #[tokio::test]
    async fn test_missing_model_is_not_retried() {
        let stub = Stub::default();
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|State(stub): State<Stub>| async move {
                    stub.requests.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }),
            )
            .with_state(stub.clone());
        let client = client(serve(router).await, 3, 2);

        assert!(matches!(
            client.embed_many(&["a".to_string()]).await,
            Err(Error::Provider { .. })
        ));
        assert_eq!(stub.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let retry = RetryPolicy::new(
            0,
            std::time::Duration::from_millis(1),
            std::time::Duration::from_secs(2),
        );
        let client = OllamaClient::new(&config, retry, 2).unwrap();
        assert!(!client.health_check().await.unwrap());
        assert!(matches!(
            client.embed_text("hello").await,
            Err(Error::Provider { .. })
        ));
    }
}
