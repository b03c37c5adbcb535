//! API routes for the document Q&A server

pub mod ingest;
pub mod query;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;
use crate::session::SessionSummary;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(ingest::ingest_documents))
        .route("/query", post(query::query_documents))
        .route("/sessions", get(list_sessions))
        .route("/info", get(info))
}

/// GET /sessions - Session ids with their entry counts
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.sessions().list())
}

/// GET /info - Service description
async fn info(State(state): State<AppState>) -> Json<Value> {
    let pipeline = state.pipeline();
    Json(json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Session-scoped document Q&A over an in-memory vector index",
        "providers": {
            "embedding": pipeline.embedder().name(),
            "generation": pipeline.generator().name(),
            "model": pipeline.generator().model(),
        },
        "retrieval": {
            "default_top_k": pipeline.default_top_k(),
        },
        "sessions": state.sessions().len(),
        "uptime_secs": state.uptime_secs(),
        "endpoints": {
            "POST /ingest": "Load documents into a session",
            "POST /query": "Retrieve context for a question (optionally generate an answer)",
            "GET /sessions": "List sessions",
            "GET /health": "Health check",
        }
    }))
}
