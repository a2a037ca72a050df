// handlers/public/images.rs - GET /api/images/serve handler

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::io::ErrorKind;

use crate::config::StorageConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::entry::{content_type_for_filename, is_contained_name};

const CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Deserialize)]
pub struct ServeQuery {
    pub filename: Option<String>,
}

/// GET /api/images/serve?filename=<name> - Stream an image from local storage
///
/// Only available when entries live on the local filesystem; blob images are
/// served by the blob store itself.
pub async fn serve_get(
    State(state): State<AppState>,
    Query(query): Query<ServeQuery>,
) -> ApiResult<Response> {
    let StorageConfig::Local { data_dir } = &state.config.storage else {
        return Err(ApiError::not_found(
            "Image serving only available in local storage mode",
        ));
    };

    let filename = query
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("Filename parameter is required"))?;

    if !is_contained_name(&filename) {
        tracing::warn!("Refused image path {:?}", filename);
        return Err(ApiError::forbidden("Access denied"));
    }
    let path = data_dir.join("images").join(&filename);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::not_found("Image not found"));
        }
        Err(e) => return Err(ApiError::internal("Error serving image", &e)),
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for_filename(&filename)),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        bytes,
    )
        .into_response())
}
