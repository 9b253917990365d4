//! Context retrieval handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use echovault_types::error::ContextError;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Request body for a retrieval query.
#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    #[serde(default)]
    pub query: Option<String>,
}

/// Ranked document texts, closest first.
#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: Vec<String>,
}

/// POST /retrieve-context - Top-k documents similar to a free-text query.
///
/// A missing or empty query is rejected before the embedder or index is
/// touched. No side effects.
pub async fn retrieve_context(
    State(state): State<AppState>,
    payload: Result<Json<ContextQuery>, JsonRejection>,
) -> Result<Json<ContextResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::BadRequest(format!("expected a JSON object payload: {e}")))?;

    let query = body
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or(ContextError::MissingQuery)?;

    let hits = state.conversation_service.retrieve_context(&query).await?;

    Ok(Json(ContextResponse {
        context: hits.into_iter().map(|hit| hit.document.text).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_field_is_optional_at_parse_time() {
        // Absence is a handler-level rejection, not a deserialization error,
        // so the response body stays in the {"error": ...} wire shape.
        let body: ContextQuery = serde_json::from_str("{}").unwrap();
        assert!(body.query.is_none());

        let body: ContextQuery = serde_json::from_str(r#"{"query": "billing"}"#).unwrap();
        assert_eq!(body.query.as_deref(), Some("billing"));
    }

    #[test]
    fn test_context_response_wire_shape() {
        let response = ContextResponse {
            context: vec!["a".to_string(), "b".to_string()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"context": ["a", "b"]}));
    }
}
