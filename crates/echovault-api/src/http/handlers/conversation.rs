//! Webhook receiver handler for end-of-call reports.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use echovault_types::conversation::EndOfCallReport;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Acknowledgment carrying the new conversation id.
#[derive(Debug, Serialize)]
pub struct StoreConversationResponse {
    pub status: &'static str,
    pub db_id: i64,
}

/// POST /store-conversation - Receive an end-of-call report.
///
/// All rejections (malformed body, wrong message type, missing transcript)
/// are synchronous and happen before anything is written. A failure while
/// indexing the summary after the relational write still acknowledges
/// success; the record is the source of truth.
pub async fn store_conversation(
    State(state): State<AppState>,
    payload: Result<Json<EndOfCallReport>, JsonRejection>,
) -> Result<Json<StoreConversationResponse>, ApiError> {
    let Json(report) =
        payload.map_err(|e| ApiError::BadRequest(format!("expected a JSON object payload: {e}")))?;

    let db_id = state.conversation_service.store_report(report).await?;

    tracing::info!(db_id, "conversation stored");

    Ok(Json(StoreConversationResponse {
        status: "stored",
        db_id,
    }))
}
