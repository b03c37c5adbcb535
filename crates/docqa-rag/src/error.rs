//! Error types for the document Q&A pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// File extension the loader cannot handle
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Path does not exist or is not accessible
    #[error("Path not found or inaccessible: {0}")]
    SourceNotFound(String),

    /// File could not be parsed
    #[error("Failed to parse '{source_id}': {message}")]
    Parse { source_id: String, message: String },

    /// Non-empty input produced no chunks
    #[error("Input produced no text chunks: {0}")]
    EmptyInput(String),

    /// Zero chunks across every reference of an ingest call
    #[error("No valid documents provided{0}")]
    NoValidDocuments(String),

    /// Query against a session that was never ingested
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Vector length differs from the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Search against an index with no entries
    #[error("Vector index is empty")]
    EmptyIndex,

    /// Embedding or generation provider failure (network, quota, timeout)
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    /// URL references are reserved but not implemented
    #[error("URL processing not yet implemented: {0}")]
    UrlNotSupported(String),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::SourceNotFound(_) => "source_not_found",
            Error::Parse { .. } => "parse_error",
            Error::EmptyInput(_) => "empty_input",
            Error::NoValidDocuments(_) => "no_valid_documents",
            Error::SessionNotFound(_) => "session_not_found",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::EmptyIndex => "empty_index",
            Error::Provider { .. } => "provider_error",
            Error::UrlNotSupported(_) => "not_implemented",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status the server variant reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedFormat(_)
            | Error::SourceNotFound(_)
            | Error::Parse { .. }
            | Error::EmptyInput(_)
            | Error::NoValidDocuments(_)
            | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::UrlNotSupported(_) => StatusCode::NOT_IMPLEMENTED,
            Error::Provider { .. } => StatusCode::BAD_GATEWAY,
            Error::DimensionMismatch { .. }
            | Error::EmptyIndex
            | Error::Config(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
