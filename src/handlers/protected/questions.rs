// handlers/protected/questions.rs - /api/questions handlers
//
// Request bodies follow the browser client's camelCase field names.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthSession;
use crate::services::questions::random_two;
use crate::services::{FollowUp, QuestionError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WildcardRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub random_item: Option<String>,
    #[serde(default)]
    pub journal_entry_session: Option<String>,
}

fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

fn question_failure(message: &str, err: QuestionError) -> ApiError {
    match err {
        QuestionError::UnknownWildcard(value) => {
            ApiError::bad_request(format!("Unknown wildcard category: {}", value))
        }
        other => ApiError::internal(message, &other),
    }
}

/// POST /api/questions/question-1 - Categorise the entry and ask about it
pub async fn question_1_post(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let content = required(payload.content, "Content is required")?;

    let question = state
        .questions
        .question_1(&content)
        .await
        .map_err(|e| question_failure("Error generating question-1", e))?;

    Ok(Json(json!({ "question": question })))
}

/// POST /api/questions/question-2 - Wildcard question within a journaling session
///
/// Expected Input:
/// ```json
/// { "content": "string", "randomItem": "SENSES_EMBODIMENT", "journalEntrySession": "string" }
/// ```
pub async fn question_2_post(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    payload: Result<Json<WildcardRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let content = required(payload.content, "Content is required")?;
    let random_item = required(payload.random_item, "Random item is required")?;
    let journal_session = required(
        payload.journal_entry_session,
        "Journal entry session is required",
    )?;

    tracing::debug!(
        "question-2 for token issued at {} in session {}",
        session.issued_at,
        journal_session
    );

    let question = state
        .questions
        .follow_up(FollowUp::Second, &content, &random_item, Some(&journal_session))
        .await
        .map_err(|e| question_failure("Error generating question-2", e))?;

    Ok(Json(json!({ "question": question })))
}

/// POST /api/questions/question-3 - Second wildcard question
pub async fn question_3_post(
    State(state): State<AppState>,
    payload: Result<Json<WildcardRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let content = required(payload.content, "Content is required")?;
    let random_item = required(payload.random_item, "Random item is required")?;

    let question = state
        .questions
        .follow_up(
            FollowUp::Third,
            &content,
            &random_item,
            payload.journal_entry_session.as_deref(),
        )
        .await
        .map_err(|e| question_failure("Error generating question-3", e))?;

    Ok(Json(json!({ "question": question })))
}

/// POST /api/questions/bridge-to-image - Transition from writing to image generation
pub async fn bridge_to_image_post(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let content = required(payload.content, "Content is required")?;

    let message = state
        .questions
        .bridge_to_image(&content)
        .await
        .map_err(|e| question_failure("Error generating bridge message", e))?;

    Ok(Json(json!({ "bridgeMessage": message })))
}

/// GET /api/questions/wildcards-random-2 - Two distinct wildcard categories
pub async fn wildcards_random_2_get() -> Json<Value> {
    Json(json!({ "items": random_two() }))
}
