//! Configuration for the document Q&A system

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Embedding / generation provider configuration
    pub provider: ProviderConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DOCQA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("DOCQA_PORT") {
            self.server.port = port;
        }
        if let Some(top_k) = env_parse::<usize>("DOCQA_TOP_K") {
            self.retrieval.top_k = top_k;
        }
        if let Ok(kind) = std::env::var("DOCQA_PROVIDER") {
            match kind.to_lowercase().as_str() {
                "openai" => self.provider.kind = ProviderKind::OpenAi,
                "ollama" => self.provider.kind = ProviderKind::Ollama,
                other => tracing::warn!("Ignoring unknown DOCQA_PROVIDER '{}'", other),
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.provider.openai.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.provider.ollama.base_url = url;
        }
    }

    /// Prompt on the terminal for the OpenAI API key when OpenAI is selected
    /// and no key is configured
    pub fn ensure_api_key(&mut self) -> Result<()> {
        if self.provider.kind != ProviderKind::OpenAi || self.provider.openai.api_key.is_some() {
            return Ok(());
        }

        let mut editor = rustyline::DefaultEditor::new()
            .map_err(|e| Error::Config(format!("Cannot prompt for API key: {}", e)))?;
        let key = editor
            .readline("Enter API key for OpenAI: ")
            .map_err(|e| Error::Config(format!("No OpenAI API key provided: {}", e)))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Config("OpenAI API key must not be empty".into()));
        }
        self.provider.openai.api_key = Some(key.to_string());
        Ok(())
    }

    /// Check invariants between settings
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_tokens == 0 {
            return Err(Error::Config("chunking.max_chunk_tokens must be >= 1".into()));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_chunk_tokens {
            return Err(Error::Config(format!(
                "chunking.overlap_tokens ({}) must be smaller than max_chunk_tokens ({})",
                self.chunking.overlap_tokens, self.chunking.max_chunk_tokens
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be >= 1".into()));
        }
        if self.provider.embed_concurrency == 0 {
            return Err(Error::Config("provider.embed_concurrency must be >= 1".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}='{}'", name, raw);
            None
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Text chunking configuration, expressed in estimated tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in tokens
    pub max_chunk_tokens: usize,
    /// Overlap between consecutive chunks in tokens
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 1000,
            overlap_tokens: 50,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned when the caller does not ask for a specific k
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Which remote provider backs embeddings and generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI HTTP API
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend selection
    pub kind: ProviderKind,
    /// Per-attempt timeout for remote calls in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Concurrent embedding requests for providers without a batch endpoint
    pub embed_concurrency: usize,
    /// OpenAI settings
    pub openai: OpenAiConfig,
    /// Ollama settings
    pub ollama: OllamaConfig,
}

impl ProviderConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            timeout_secs: 60,
            max_retries: 2,
            embed_concurrency: 4,
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL
    pub base_url: String,
    /// API key; usually supplied through `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Embedding model
    pub embed_model: String,
    /// Chat model used for answers
    pub chat_model: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            embed_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("embed_model", &self.embed_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2".to_string(),
            temperature: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml(
            r#"
            [chunking]
            max_chunk_tokens = 200

            [provider]
            kind = "ollama"

            [provider.ollama]
            generate_model = "llama3.2:1b"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.max_chunk_tokens, 200);
        assert_eq!(config.chunking.overlap_tokens, 50);
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.provider.ollama.generate_model, "llama3.2:1b");
        assert_eq!(config.provider.ollama.embed_model, "nomic-embed-text");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.overlap_tokens = config.chunking.max_chunk_tokens;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let mut config = OpenAiConfig::default();
        config.api_key = Some("sk-secret".into());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
