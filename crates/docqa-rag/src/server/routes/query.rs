//! Query endpoint: retrieval, optionally followed by generation

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /query - Retrieve context for a question
///
/// Returns `{context, metadata}`; with `generate: true` an `answer` is added.
pub async fn query_documents(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) = payload.map_err(|e| Error::invalid(e.body_text()))?;
    let start = Instant::now();

    tracing::info!(
        "Query on session '{}': \"{}\"",
        request.session_id,
        request.query
    );

    let pipeline = state.pipeline();
    let response = if request.generate {
        let answer = pipeline
            .query(&request.session_id, &request.query, request.top_k)
            .await?;
        QueryResponse::from_answer(answer)
    } else {
        let results = pipeline
            .retrieve(&request.session_id, &request.query, request.top_k)
            .await?;
        QueryResponse::from_results(&results)
    };

    tracing::debug!(
        "Query returned {} chunks in {}ms",
        response.context.len(),
        start.elapsed().as_millis()
    );

    Ok(Json(response))
}
