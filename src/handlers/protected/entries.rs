// handlers/protected/entries.rs - /api/entries handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::entry::compose_entry_content;
use crate::storage::{Entry, ListQuery, NewEntry};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEntryRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// GET /api/entries - Every entry, newest first
pub async fn list_get(State(state): State<AppState>) -> ApiResult<Json<Vec<Entry>>> {
    let entries = state
        .storage
        .list_entries(ListQuery::default())
        .await
        .map_err(|e| ApiError::storage("Error reading entries", e))?;
    Ok(Json(entries))
}

/// POST /api/entries - Create an entry, optionally carrying image metadata
///
/// Expected Input:
/// ```json
/// { "content": "string", "imagePrompt": "string?", "imageUrl": "string?" }
/// ```
///
/// Responds 201 with `{ "id": "<unix-ms>.txt" }`.
pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(payload) = payload?;

    let content = payload
        .content
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Content is required"))?;

    let now = Utc::now();
    let entry = NewEntry {
        id: now.timestamp_millis().to_string(),
        content: compose_entry_content(
            &content,
            payload.image_prompt.as_deref(),
            payload.image_url.as_deref(),
        ),
        created_at: now,
    };

    let saved = state
        .storage
        .save_entry(entry)
        .await
        .map_err(|e| ApiError::storage("Error saving entry", e))?;
    tracing::info!("Saved entry {}", saved.id);

    Ok((StatusCode::CREATED, Json(json!({ "id": saved.id }))))
}

/// DELETE /api/entries/delete - Remove an entry and the image it references
pub async fn delete(
    State(state): State<AppState>,
    payload: Result<Json<DeleteEntryRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(payload) = payload?;

    let id = payload
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("id is required in request body"))?;

    state
        .storage
        .delete_entry(&id)
        .await
        .map_err(|e| ApiError::storage("Error deleting entry and image", e))?;
    tracing::info!("Deleted entry {}", id);

    Ok(StatusCode::NO_CONTENT)
}
