//! Document ingestion endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentReference, IngestRequest, IngestResponse};

/// POST /ingest - Load, embed and index documents into a session
pub async fn ingest_documents(
    State(state): State<AppState>,
    payload: std::result::Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>> {
    let Json(request) = payload.map_err(|e| Error::invalid(e.body_text()))?;
    let start = Instant::now();

    if request.session_id.trim().is_empty() {
        return Err(Error::invalid("session_id must not be empty"));
    }

    let references = to_references(request.documents);

    tracing::info!(
        "Ingesting {} document references into session '{}'",
        references.len(),
        request.session_id
    );

    let outcome = state
        .pipeline()
        .ingest(&request.session_id, &references)
        .await?;

    tracing::info!(
        "Ingest into '{}' finished in {}ms",
        request.session_id,
        start.elapsed().as_millis()
    );

    Ok(Json(IngestResponse::from_outcome(request.session_id, outcome)))
}

/// Convert wire references, labelling inline content by its request position.
/// Items with no field set are dropped with a warning.
fn to_references(
    documents: Vec<crate::types::DocumentReferenceBody>,
) -> Vec<DocumentReference> {
    documents
        .into_iter()
        .enumerate()
        .filter_map(|(i, body)| match body.into_reference() {
            Some(DocumentReference::Content { text, label: None }) => {
                Some(DocumentReference::Content {
                    text,
                    label: Some(format!("inline:{}", i)),
                })
            }
            Some(reference) => Some(reference),
            None => {
                tracing::warn!(
                    "Skipping document {}: none of file_path, url or content is set",
                    i
                );
                None
            }
        })
        .collect()
}
