use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use time::OffsetDateTime;

use crate::app::AppState;
use crate::constants::*;
use crate::models::{AddDocumentPayload, Document, DocumentEntry};
use crate::utils::{ledger_error, not_found, validate_filename, validate_string_length};

pub async fn add_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<AddDocumentPayload>,
) -> Result<(StatusCode, Json<Document>), (StatusCode, String)> {
    validate_string_length(&payload.storage_path, "Storage path", MAX_STORAGE_PATH_LENGTH)?;
    let document = Document {
        filename: validate_filename(&payload.filename)?,
        storage_path: payload.storage_path.trim().to_string(),
        size: payload.size,
        uploaded_at: OffsetDateTime::now_utc(),
    };

    let mut ledger = state.ledger.write().await;
    if !ledger
        .add_document(id, document.clone())
        .map_err(ledger_error)?
    {
        return Err(not_found(ERR_EXPENSE_NOT_FOUND));
    }

    tracing::info!(id, filename = %document.filename, "document attached");
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn remove_document(
    State(state): State<AppState>,
    Path((id, filename)): Path<(u64, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut ledger = state.ledger.write().await;
    if ledger.get_by_id(id).is_none() {
        return Err(not_found(ERR_EXPENSE_NOT_FOUND));
    }
    if !ledger
        .remove_document(id, &filename)
        .map_err(ledger_error)?
    {
        return Err(not_found(ERR_DOCUMENT_NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<DocumentEntry>>), (StatusCode, String)> {
    let ledger = state.ledger.read().await;
    Ok((StatusCode::OK, Json(ledger.documents())))
}
