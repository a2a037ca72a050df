// handlers/protected/images.rs - /api/images handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::services::ImageError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptIdeaRequest {
    #[serde(default)]
    pub content: Option<String>,
}

/// Configuration problems surface verbatim; everything else hides behind `message`.
fn image_failure(message: &str, err: ImageError) -> ApiError {
    match err {
        ImageError::Config(cfg) => cfg.into(),
        other => ApiError::internal(message, &other),
    }
}

/// POST /api/images/generate - Generate, store and link an image
///
/// Responds with `{ "imageUrl": "..." }`.
pub async fn generate_post(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;

    let prompt = payload
        .prompt
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Prompt is required"))?;

    state.images.check_generator()?;

    let image_url = state
        .images
        .generate(&prompt)
        .await
        .map_err(|e| image_failure("Error generating image", e))?;

    Ok(Json(json!({ "imageUrl": image_url })))
}

/// POST /api/images/generate-prompt-idea - Suggest an image prompt for an entry
pub async fn prompt_idea_post(
    State(state): State<AppState>,
    payload: Result<Json<PromptIdeaRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;

    let content = payload
        .content
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Content is required"))?;

    let idea = state
        .images
        .generate_prompt_idea(&content)
        .await
        .map_err(|e| image_failure("Error generating image prompt idea", e))?;

    Ok(Json(json!({ "imageIdea": idea })))
}
